//! Hand a buffered upload to the content-addressed store.
//!
//! Hashing and disk writes are blocking, so they run on the blocking pool.

use evhub_store::StoredFile;

use crate::error::AppError;
use crate::extractors::UploadedFile;
use crate::state::AppState;

/// Store one upload and count it in the metrics.
pub async fn store_upload(state: &AppState, upload: UploadedFile) -> Result<StoredFile, AppError> {
    let store = state.file_store.clone();
    let UploadedFile { filename, content } = upload;

    let stored = tokio::task::spawn_blocking(move || store.store_file(&content[..], &filename))
        .await
        .map_err(|e| AppError::Internal(format!("upload task failed: {e}")))??;

    state.metrics.record_upload(stored.size);
    tracing::info!(
        name = %stored.display_name,
        path = %stored.path,
        size = stored.size,
        "stored upload"
    );

    Ok(stored)
}
