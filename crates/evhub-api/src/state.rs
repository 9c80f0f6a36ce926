//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor.
//!
//! ## Architecture
//!
//! - **Events / Files**: in-memory record stores, authoritative while the
//!   process runs. When a database is configured every write goes to
//!   Postgres first and the stores are hydrated from it at startup.
//! - **File store**: the content-addressed store under the data directory.
//!   Handlers hand it upload bytes and record the relative path it returns.
//! - **Metrics**: request and upload counters.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use evhub_store::{FileStore, StoreError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use utoipa::ToSchema;

use crate::middleware::metrics::ApiMetrics;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory record store keyed by integer id.
///
/// Ids are allocated from a monotonic counter starting at 1. Inserting a
/// record with an explicit id (hydration) advances the counter past it.
/// The lock is `parking_lot` and never held across `.await` points.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<BTreeMap<i64, T>>>,
    next_id: Arc<AtomicI64>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Reserve the next unused id.
    pub fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Ensure future allocations never return `id` or anything below it.
    pub fn reserve_through(&self, id: i64) {
        self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: i64, value: T) -> Option<T> {
        self.reserve_through(id);
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by id.
    pub fn get(&self, id: &i64) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records in ascending id order.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// The `limit` records with the highest ids, newest first.
    pub fn list_recent(&self, limit: usize) -> Vec<T> {
        self.data.read().values().rev().take(limit).cloned().collect()
    }

    /// Records matching a predicate, in ascending id order.
    pub fn filter(&self, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &i64, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Remove a record by id.
    pub fn remove(&self, id: &i64) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &i64) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Records ------------------------------------------------------------------

/// An event, without its attached files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRecord {
    /// Attach files for a detail response.
    pub fn with_files(self, files: Vec<FileRecord>) -> EventWithFiles {
        EventWithFiles {
            id: self.id,
            title: self.title,
            description: self.description,
            files,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A file attached to an event.
///
/// `storage_path` is the relative path returned by the content-addressed
/// store. Two records may share it when the same bytes were uploaded twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileRecord {
    pub id: i64,
    pub event_id: i64,
    /// Original client filename.
    pub name: String,
    /// `<3 hex>/<3 hex>/<58 hex>.<ext>` relative to the data directory.
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}

/// An event together with its files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventWithFiles {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub files: Vec<FileRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Configuration ------------------------------------------------------------

/// Error reading configuration from the environment.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable was set to an unparseable value.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Root of the content-addressed upload store.
    pub data_dir: PathBuf,
    /// Directory served at `/` and `/assets/*`.
    pub public_dir: PathBuf,
    /// Number of events returned by `GET /events`.
    pub list_limit: usize,
    /// Maximum accepted request body size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 1323,
            data_dir: PathBuf::from("./data"),
            public_dir: PathBuf::from("./public"),
            list_limit: 10,
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Build configuration from process environment variables.
    ///
    /// | Variable           | Default     |
    /// |--------------------|-------------|
    /// | `PORT`             | `1323`      |
    /// | `DATA_DIR`         | `./data`    |
    /// | `PUBLIC_DIR`       | `./public`  |
    /// | `EVENT_LIST_LIMIT` | `10`        |
    /// | `MAX_UPLOAD_BYTES` | `33554432`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: parse_var(&lookup, "PORT", defaults.port)?,
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            public_dir: lookup("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.public_dir),
            list_limit: parse_var(&lookup, "EVENT_LIST_LIMIT", defaults.list_limit)?,
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

// -- AppState -----------------------------------------------------------------

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub events: Store<EventRecord>,
    pub files: Store<FileRecord>,

    /// Content-addressed store for upload bytes.
    pub file_store: FileStore,

    /// PostgreSQL connection pool. When `None`, the API runs in-memory only.
    pub db_pool: Option<PgPool>,

    pub metrics: ApiMetrics,
    pub config: AppConfig,
}

impl AppState {
    /// Build state without touching disk or a database.
    pub fn new(config: AppConfig) -> Self {
        Self {
            events: Store::new(),
            files: Store::new(),
            file_store: FileStore::new(config.data_dir.clone()),
            db_pool: None,
            metrics: ApiMetrics::new(),
            config,
        }
    }

    /// Build state for serving: ensures the data directory exists.
    pub fn open(config: AppConfig, db_pool: Option<PgPool>) -> Result<Self, StoreError> {
        let file_store = FileStore::open(config.data_dir.clone())?;
        Ok(Self {
            file_store,
            db_pool,
            ..Self::new(config)
        })
    }

    /// Files attached to an event, oldest first.
    pub fn files_for_event(&self, event_id: i64) -> Vec<FileRecord> {
        self.files.filter(|f| f.event_id == event_id)
    }

    /// An event with its files, or `None` if the event does not exist.
    pub fn event_with_files(&self, event_id: i64) -> Option<EventWithFiles> {
        self.events
            .get(&event_id)
            .map(|event| event.with_files(self.files_for_event(event_id)))
    }

    /// Load persisted events and files into the in-memory stores.
    ///
    /// No-op without a database.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let events = crate::db::events::load_all(pool)
            .await
            .map_err(|e| format!("failed to load events: {e}"))?;
        let event_count = events.len();
        for record in events {
            self.events.insert(record.id, record);
        }

        let files = crate::db::files::load_all(pool)
            .await
            .map_err(|e| format!("failed to load files: {e}"))?;
        let file_count = files.len();
        for record in files {
            self.files.insert(record.id, record);
        }

        // Soft-deleted rows are not loaded but their ids stay taken.
        let max_file_id = crate::db::files::max_id(pool)
            .await
            .map_err(|e| format!("failed to read file id high-water mark: {e}"))?;
        if let Some(id) = max_file_id {
            self.files.reserve_through(id);
        }

        tracing::info!(
            events = event_count,
            files = file_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}
