//! Event persistence operations on the `events` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::state::{EventRecord, FileRecord};

/// Insert an event together with the files uploaded alongside it, atomically.
pub async fn insert_with_files(
    pool: &PgPool,
    event: &EventRecord,
    files: &[FileRecord],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO events (id, title, description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(event.id)
    .bind(&event.title)
    .bind(&event.description)
    .bind(event.created_at)
    .bind(event.updated_at)
    .execute(&mut *tx)
    .await?;

    for file in files {
        super::files::insert_in(&mut tx, file).await?;
    }

    tx.commit().await
}

/// Overwrite title and description. Returns `false` if no such event exists.
pub async fn update(
    pool: &PgPool,
    id: i64,
    title: &str,
    description: &str,
    updated_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE events SET title = $1, description = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(title)
    .bind(description)
    .bind(updated_at)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all events into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<EventRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EventRow>(
        "SELECT id, title, description, created_at, updated_at FROM events ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(EventRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i64,
    title: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EventRow {
    fn into_record(self) -> EventRecord {
        EventRecord {
            id: self.id,
            title: self.title,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
