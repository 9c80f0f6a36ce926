//! # evhub-core: Foundational Types
//!
//! Leaf crate of the evhub workspace. Defines the content digest that names
//! every stored upload and the identifier newtypes for event and file
//! records.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `evhub-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod identity;

pub use digest::{sha256_digest, sha256_hex, ContentDigest, Sha256Hasher, DIGEST_HEX_LEN};
pub use error::ValidationError;
pub use identity::{EventId, FileId};
