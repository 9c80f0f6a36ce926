//! # Form Extractors
//!
//! Event endpoints accept browser-style forms rather than JSON. [`FormData`]
//! reads either `multipart/form-data` (text fields plus file parts) or
//! `application/x-www-form-urlencoded` (text fields only) and maps every
//! parse failure to an [`AppError`].

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::Form;

use crate::error::AppError;

/// One file part of a multipart body, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied filename. May be empty when a browser submits an
    /// empty file input.
    pub filename: String,
    pub content: Bytes,
}

/// Text fields and file parts of a submitted form.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: Vec<(String, UploadedFile)>,
}

impl FormData {
    /// A text field, if present.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// A text field, or the empty string when absent.
    pub fn text_or_default(&self, name: &str) -> String {
        self.text(name).unwrap_or_default().to_string()
    }

    /// Remove and return every file part submitted under `name`, in body order.
    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        let (matching, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition::<Vec<_>, _>(|(field, _)| field == name);
        self.files = rest;
        matching.into_iter().map(|(_, file)| file).collect()
    }

    /// Remove and return the first file part submitted under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        let idx = self.files.iter().position(|(field, _)| field == name)?;
        Some(self.files.remove(idx).1)
    }
}

fn body_error(status: StatusCode, text: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(text)
    } else {
        AppError::BadRequest(text)
    }
}

#[axum::async_trait]
impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;

            let mut form = FormData::default();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?
            {
                let name = field.name().unwrap_or_default().to_string();
                match field.file_name().map(str::to_string) {
                    Some(filename) => {
                        let content = field
                            .bytes()
                            .await
                            .map_err(|e| body_error(e.status(), e.body_text()))?;
                        form.files.push((name, UploadedFile { filename, content }));
                    }
                    None => {
                        let text = field
                            .text()
                            .await
                            .map_err(|e| body_error(e.status(), e.body_text()))?;
                        form.fields.insert(name, text);
                    }
                }
            }
            Ok(form)
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;
            Ok(FormData {
                fields,
                files: Vec::new(),
            })
        } else {
            Err(AppError::BadRequest(format!(
                "unsupported content type {content_type:?}: expected multipart/form-data \
                 or application/x-www-form-urlencoded"
            )))
        }
    }
}
