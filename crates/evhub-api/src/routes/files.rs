//! # Event Files API
//!
//! - **POST `/events/:id/files`**: store one file and attach it
//! - **DELETE `/events/:id/files/:file_id`**: detach a file record
//!
//! Detaching only removes the record. The stored bytes stay in place since
//! other records may reference the same content path.

use axum::extract::{Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use chrono::Utc;
use evhub_core::{EventId, FileId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::FormData;
use crate::routes::OkResponse;
use crate::state::{AppState, FileRecord};
use crate::upload::store_upload;

/// Multipart body of `POST /events/:id/files`. Documentation only.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct AddFileForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Response of `POST /events/:id/files`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddFileResponse {
    pub result: String,
    pub file: FileRecord,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/:id/files", post(add_file))
        .route("/events/:id/files/:file_id", delete(delete_file))
}

/// POST /events/:id/files: Store one file and attach it to the event.
#[utoipa::path(
    post,
    path = "/events/{id}/files",
    params(("id" = i64, Path, description = "Event ID")),
    request_body(content = AddFileForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored and attached", body = AddFileResponse),
        (status = 404, description = "Event not found", body = crate::error::ErrorBody),
        (status = 422, description = "Missing file part or unusable filename", body = crate::error::ErrorBody),
    ),
    tag = "files"
)]
async fn add_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut form: FormData,
) -> Result<Json<AddFileResponse>, AppError> {
    let event_id = EventId::parse(&id)?;
    if !state.events.contains(&event_id.get()) {
        return Err(AppError::NotFound(format!("event {event_id} not found")));
    }

    let upload = form
        .take_file("file")
        .ok_or_else(|| AppError::Validation("multipart part \"file\" is required".to_string()))?;
    let (storage_path, name) = store_upload(&state, upload).await?.into_parts();

    let record = FileRecord {
        id: state.files.allocate_id(),
        event_id: event_id.get(),
        name,
        storage_path,
        created_at: Utc::now(),
    };

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::files::insert(pool, &record).await {
            tracing::error!(file_id = record.id, error = %e, "failed to persist file record");
            return Err(AppError::Internal(
                "file stored but database persist failed".to_string(),
            ));
        }
    }

    state.files.insert(record.id, record.clone());
    tracing::info!(event_id = record.event_id, file_id = record.id, "attached file");

    Ok(Json(AddFileResponse {
        result: "ok".to_string(),
        file: record,
    }))
}

/// DELETE /events/:id/files/:file_id: Detach a file record from the event.
#[utoipa::path(
    delete,
    path = "/events/{id}/files/{file_id}",
    params(
        ("id" = i64, Path, description = "Event ID"),
        ("file_id" = i64, Path, description = "File record ID"),
    ),
    responses(
        (status = 200, description = "File record removed", body = OkResponse),
        (status = 404, description = "No such file on this event", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid ID", body = crate::error::ErrorBody),
    ),
    tag = "files"
)]
async fn delete_file(
    State(state): State<AppState>,
    Path((id, file_id)): Path<(String, String)>,
) -> Result<Json<OkResponse>, AppError> {
    let event_id = EventId::parse(&id)?;
    let file_id = FileId::parse(&file_id)?;

    let not_found = || AppError::NotFound(format!("file {file_id} not found on event {event_id}"));
    match state.files.get(&file_id.get()) {
        Some(record) if record.event_id == event_id.get() => {}
        _ => return Err(not_found()),
    }

    if let Some(pool) = &state.db_pool {
        match crate::db::files::soft_delete(pool, file_id.get(), event_id.get(), Utc::now()).await
        {
            Ok(true) => {}
            Ok(false) => return Err(not_found()),
            Err(e) => {
                tracing::error!(file_id = file_id.get(), error = %e, "failed to persist file deletion");
                return Err(AppError::Internal("database delete failed".to_string()));
            }
        }
    }

    state.files.remove(&file_id.get());
    tracing::info!(event_id = event_id.get(), file_id = file_id.get(), "detached file");
    Ok(Json(OkResponse::ok()))
}
