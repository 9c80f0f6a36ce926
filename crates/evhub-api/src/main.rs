//! # evhub-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the environment;
//! see [`AppConfig::from_env`].

use evhub_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing. LOG_FORMAT=json switches to JSON lines.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    let port = config.port;

    // Initialize database pool (optional, absent means in-memory only).
    let db_pool = evhub_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let state = AppState::open(config, db_pool).map_err(|e| {
        tracing::error!("Data directory unusable: {e}");
        e
    })?;

    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    tracing::info!(
        data_dir = %state.file_store.root().display(),
        public_dir = %state.config.public_dir.display(),
        "content store ready"
    );

    let app = evhub_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("evhub API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
