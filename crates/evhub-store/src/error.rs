//! # Store Error Types
//!
//! Every failure on the upload path is reported to the caller; none of them
//! abort the process. Directory creation distinguishes "already exists"
//! (success) from genuine creation failures.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from content-addressed store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The client-supplied filename cannot produce a safe extension.
    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    /// A persisted relative path does not have the sharded layout.
    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    /// Reading the upload stream failed.
    #[error("failed to read upload content: {0}")]
    SourceRead(#[source] std::io::Error),

    /// Creating the data root or a shard directory failed.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A shard path exists but is not a directory.
    #[error("{} exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Creating, writing, syncing, or renaming the destination failed.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// File being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Stored bytes no longer hash to the digest encoded in their path.
    #[error("integrity violation: {} has digest {actual} but path says {expected}", .path.display())]
    Integrity {
        /// File that failed verification.
        path: PathBuf,
        /// Digest encoded in the storage path.
        expected: String,
        /// Digest recomputed from the stored bytes.
        actual: String,
    },

    /// I/O error on a read path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether the error was caused by client input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidFilename(_))
    }
}
