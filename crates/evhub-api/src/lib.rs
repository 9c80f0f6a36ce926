//! # evhub-api: HTTP Service
//!
//! Axum service for events and their attached files.
//!
//! ## Layout
//!
//! - `routes`: event and file handlers plus the static front-end.
//! - `extractors`: multipart / url-encoded form parsing.
//! - `upload`: bridge from buffered uploads to `evhub-store`.
//! - `state`: in-memory record stores, configuration, shared state.
//! - `db`: optional Postgres write-through and startup hydration.
//! - `middleware`: request tracing and counters.
//!
//! Health probes under `/health/*` and `/openapi.json` sit beside the API.

pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod upload;

use axum::extract::{DefaultBodyLimit, State};
use axum::middleware::from_fn;
use axum::routing::get;
use axum::{Json, Router};

use crate::middleware::metrics::MetricsSnapshot;
use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let metrics = state.metrics.clone();

    let api = Router::new()
        .merge(routes::events::router())
        .merge(routes::files::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(metrics))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/health/metrics", get(metrics_snapshot))
        .with_state(state.clone());

    Router::new()
        .merge(health)
        .merge(routes::assets::router(&state.config.public_dir))
        .merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

/// Ready once the data directory is usable.
async fn readiness(State(state): State<AppState>) -> (axum::http::StatusCode, &'static str) {
    if state.file_store.root().is_dir() {
        (axum::http::StatusCode::OK, "ready")
    } else {
        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "data directory unavailable")
    }
}

async fn metrics_snapshot(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
