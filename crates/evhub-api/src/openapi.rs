//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one document served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI document for the evhub API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "evhub API",
        version = "0.1.0",
        description = "Events with attached uploads. Upload bytes are stored content-addressed under the data directory.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Events
        crate::routes::events::create_event,
        crate::routes::events::list_events,
        crate::routes::events::get_event,
        crate::routes::events::update_event,
        // Files
        crate::routes::files::add_file,
        crate::routes::files::delete_file,
    ),
    components(schemas(
        crate::state::EventRecord,
        crate::state::FileRecord,
        crate::state::EventWithFiles,
        crate::routes::OkResponse,
        crate::routes::events::CreateEventForm,
        crate::routes::events::UpdateEventForm,
        crate::routes::events::EventList,
        crate::routes::files::AddFileForm,
        crate::routes::files::AddFileResponse,
        crate::middleware::metrics::MetricsSnapshot,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "events", description = "Event records"),
        (name = "files", description = "Files attached to events"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
