//! Static front-end: `index.html` at `/`, everything else under `/assets/*`.

use std::path::Path;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

/// Serve the public directory. Missing files answer 404.
pub fn router(public_dir: &Path) -> Router {
    Router::new()
        .route_service("/", ServeFile::new(public_dir.join("index.html")))
        .nest_service("/assets", ServeDir::new(public_dir))
}
