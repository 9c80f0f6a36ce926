//! File record persistence operations on the `files` table.
//!
//! Deletion is soft: the row keeps its `storage_path` and gains a
//! `deleted_at` timestamp. Stored bytes are never touched from here.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::state::FileRecord;

const INSERT_SQL: &str = "INSERT INTO files (id, event_id, name, storage_path, created_at)
     VALUES ($1, $2, $3, $4, $5)";

/// Insert a file record.
pub async fn insert(pool: &PgPool, record: &FileRecord) -> Result<(), sqlx::Error> {
    sqlx::query(INSERT_SQL)
        .bind(record.id)
        .bind(record.event_id)
        .bind(&record.name)
        .bind(&record.storage_path)
        .bind(record.created_at)
        .execute(pool)
        .await?;

    Ok(())
}

/// Insert a file record inside an open transaction.
pub(crate) async fn insert_in(
    tx: &mut Transaction<'_, Postgres>,
    record: &FileRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(INSERT_SQL)
        .bind(record.id)
        .bind(record.event_id)
        .bind(&record.name)
        .bind(&record.storage_path)
        .bind(record.created_at)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Mark a live file record of the given event as deleted.
///
/// Returns `false` if no live record matched.
pub async fn soft_delete(
    pool: &PgPool,
    id: i64,
    event_id: i64,
    deleted_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE files SET deleted_at = $1
         WHERE id = $2 AND event_id = $3 AND deleted_at IS NULL",
    )
    .bind(deleted_at)
    .bind(id)
    .bind(event_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all live file records on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<FileRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, FileRow>(
        "SELECT id, event_id, name, storage_path, created_at
         FROM files WHERE deleted_at IS NULL ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(FileRow::into_record).collect())
}

/// Highest file id ever issued, including soft-deleted rows.
pub async fn max_id(pool: &PgPool) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(id) FROM files")
        .fetch_one(pool)
        .await
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: i64,
    event_id: i64,
    name: String,
    storage_path: String,
    created_at: DateTime<Utc>,
}

impl FileRow {
    fn into_record(self) -> FileRecord {
        FileRecord {
            id: self.id,
            event_id: self.event_id,
            name: self.name,
            storage_path: self.storage_path,
            created_at: self.created_at,
        }
    }
}
