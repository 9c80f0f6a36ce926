//! # evhub-store: Content-Addressed Upload Storage
//!
//! Turns an uploaded byte stream into a file at a deterministic location
//! under a data root:
//!
//! ```text
//! <root>/<3 hex>/<3 hex>/<58 hex>.<ext>
//! ```
//!
//! The hex string is the SHA-256 of the content and `<ext>` is the part of
//! the client filename after its last `.`. Callers get back the relative
//! path and the original filename and persist both themselves; this crate
//! knows nothing about the records that reference stored files.
//!
//! ## Crate Policy
//!
//! - Depends only on `evhub-core` internally.
//! - Every I/O failure is returned as a [`StoreError`]; nothing panics.
//! - Synchronous `std::fs` only. Async callers run it on a blocking thread.

pub mod error;
pub mod path;
pub mod store;

pub use error::StoreError;
pub use path::{extension_of, StoragePath};
pub use store::{FileStore, StoredFile};
