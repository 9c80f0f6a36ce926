//! # Events API
//!
//! - **POST `/events`**: create an event, storing any uploaded files
//! - **GET `/events`**: the most recent events, newest first
//! - **GET `/events/:id`**: one event with its files
//! - **PUT `/events/:id`**: overwrite title and description
//!
//! Bodies are `multipart/form-data` (or url-encoded for updates). Uploaded
//! bytes go to the content-addressed store before any record is written,
//! so a failed upload never leaves a record pointing at missing content.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use evhub_core::EventId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::FormData;
use crate::routes::OkResponse;
use crate::state::{AppState, EventRecord, EventWithFiles, FileRecord};
use crate::upload::store_upload;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Multipart body of `POST /events`. Documentation only; parsed by [`FormData`].
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CreateEventForm {
    title: String,
    description: String,
    /// Zero or more files. Parts with an empty filename are ignored.
    #[schema(value_type = Vec<String>, format = Binary)]
    files: Vec<Vec<u8>>,
}

/// Body of `PUT /events/:id`. Documentation only; parsed by [`FormData`].
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UpdateEventForm {
    title: String,
    description: String,
}

/// Response of `GET /events`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventList {
    pub events: Vec<EventRecord>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/:id", get(get_event).put(update_event))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /events: Create an event and store its files.
#[utoipa::path(
    post,
    path = "/events",
    request_body(content = CreateEventForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Event created", body = EventWithFiles),
        (status = 400, description = "Malformed form body", body = crate::error::ErrorBody),
        (status = 422, description = "Unusable filename", body = crate::error::ErrorBody),
    ),
    tag = "events"
)]
async fn create_event(
    State(state): State<AppState>,
    mut form: FormData,
) -> Result<(StatusCode, Json<EventWithFiles>), AppError> {
    let title = form.text_or_default("title");
    let description = form.text_or_default("description");

    let mut stored = Vec::new();
    for upload in form.take_files("files") {
        if upload.filename.is_empty() {
            continue;
        }
        stored.push(store_upload(&state, upload).await?);
    }

    let now = Utc::now();
    let event = EventRecord {
        id: state.events.allocate_id(),
        title,
        description,
        created_at: now,
        updated_at: now,
    };
    let files: Vec<FileRecord> = stored
        .into_iter()
        .map(|file| {
            let (storage_path, name) = file.into_parts();
            FileRecord {
                id: state.files.allocate_id(),
                event_id: event.id,
                name,
                storage_path,
                created_at: now,
            }
        })
        .collect();

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::events::insert_with_files(pool, &event, &files).await {
            tracing::error!(event_id = event.id, error = %e, "failed to persist event to database");
            return Err(AppError::Internal(
                "event files stored but database persist failed".to_string(),
            ));
        }
    }

    state.events.insert(event.id, event.clone());
    for file in &files {
        state.files.insert(file.id, file.clone());
    }

    tracing::info!(event_id = event.id, files = files.len(), "created event");
    Ok((StatusCode::CREATED, Json(event.with_files(files))))
}

/// GET /events: The most recent events, newest first.
#[utoipa::path(
    get,
    path = "/events",
    responses(
        (status = 200, description = "Most recent events", body = EventList),
    ),
    tag = "events"
)]
async fn list_events(State(state): State<AppState>) -> Json<EventList> {
    Json(EventList {
        events: state.events.list_recent(state.config.list_limit),
    })
}

/// GET /events/:id: One event with its files.
#[utoipa::path(
    get,
    path = "/events/{id}",
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event found", body = EventWithFiles),
        (status = 404, description = "Event not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid event ID", body = crate::error::ErrorBody),
    ),
    tag = "events"
)]
async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EventWithFiles>, AppError> {
    let id = EventId::parse(&id)?;
    state
        .event_with_files(id.get())
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("event {id} not found")))
}

/// PUT /events/:id: Overwrite title and description.
///
/// Fields missing from the body are stored as empty strings.
#[utoipa::path(
    put,
    path = "/events/{id}",
    params(("id" = i64, Path, description = "Event ID")),
    request_body(content = UpdateEventForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Event updated", body = OkResponse),
        (status = 404, description = "Event not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid event ID", body = crate::error::ErrorBody),
    ),
    tag = "events"
)]
async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: FormData,
) -> Result<Json<OkResponse>, AppError> {
    let id = EventId::parse(&id)?;
    if !state.events.contains(&id.get()) {
        return Err(AppError::NotFound(format!("event {id} not found")));
    }

    let title = form.text_or_default("title");
    let description = form.text_or_default("description");
    let now = Utc::now();

    if let Some(pool) = &state.db_pool {
        match crate::db::events::update(pool, id.get(), &title, &description, now).await {
            Ok(true) => {}
            Ok(false) => return Err(AppError::NotFound(format!("event {id} not found"))),
            Err(e) => {
                tracing::error!(event_id = id.get(), error = %e, "failed to persist event update");
                return Err(AppError::Internal("database update failed".to_string()));
            }
        }
    }

    state
        .events
        .update(&id.get(), |event| {
            event.title = title;
            event.description = description;
            event.updated_at = now;
        })
        .ok_or_else(|| AppError::NotFound(format!("event {id} not found")))?;

    tracing::info!(event_id = id.get(), "updated event");
    Ok(Json(OkResponse::ok()))
}
