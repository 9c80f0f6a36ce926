//! # Error Types
//!
//! Validation errors shared by every evhub crate. Uses `thiserror` for
//! derive-based `Display` and `Error` implementations.

use thiserror::Error;

/// Input rejected at a type boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A hex digest did not have the expected shape.
    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    /// A record identifier was not a positive integer.
    #[error("invalid {kind} id: {value:?}")]
    InvalidId {
        /// Which identifier namespace rejected the value.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },
}
