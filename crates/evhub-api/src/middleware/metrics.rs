//! # Request and Upload Metrics
//!
//! In-process atomic counters, exposed as JSON at `/health/metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Shared metrics state.
#[derive(Debug, Clone)]
pub struct ApiMetrics {
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
    pub files_stored: Arc<AtomicU64>,
    pub bytes_stored: Arc<AtomicU64>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub errors: u64,
    pub files_stored: u64,
    pub bytes_stored: u64,
}

impl ApiMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self {
            request_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
            files_stored: Arc::new(AtomicU64::new(0)),
            bytes_stored: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return current request count.
    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Return current error count.
    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Count one successfully stored upload of `size` bytes.
    pub fn record_upload(&self, size: u64) {
        self.files_stored.fetch_add(1, Ordering::Relaxed);
        self.bytes_stored.fetch_add(size, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests(),
            errors: self.errors(),
            files_stored: self.files_stored.load(Ordering::Relaxed),
            bytes_stored: self.bytes_stored.load(Ordering::Relaxed),
        }
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware that increments request and error counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.request_count.fetch_add(1, Ordering::Relaxed);
        if response.status().is_server_error() || response.status().is_client_error() {
            m.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    response
}
