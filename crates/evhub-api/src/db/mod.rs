//! # Database Persistence Layer
//!
//! Optional Postgres persistence for events and file records via SQLx.
//!
//! When `DATABASE_URL` is set, every create, update, and delete is written
//! to PostgreSQL before the in-memory stores change, and the stores are
//! hydrated from the database at startup. When absent, the API runs
//! in-memory only; uploaded bytes still land on disk either way.

pub mod events;
pub mod files;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only. \
                 Event and file records will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
