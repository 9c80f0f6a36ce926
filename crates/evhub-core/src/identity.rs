//! # Record Identifier Newtypes
//!
//! Events and files are numbered by the relational store with positive
//! 64-bit integers. These newtypes keep the two namespaces apart so an
//! `EventId` can never be passed where a `FileId` is expected, and they
//! reject zero and negative values at the boundary.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifier of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

/// Identifier of a stored file record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(i64);

fn parse_positive(kind: &'static str, raw: &str) -> Result<i64, ValidationError> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidId {
            kind,
            value: raw.to_string(),
        })?;
    if value <= 0 {
        return Err(ValidationError::InvalidId {
            kind,
            value: raw.to_string(),
        });
    }
    Ok(value)
}

macro_rules! impl_record_id {
    ($ty:ident, $kind:literal) => {
        impl $ty {
            /// Wrap a raw identifier. Rejects zero and negative values.
            pub fn new(value: i64) -> Result<Self, ValidationError> {
                if value <= 0 {
                    return Err(ValidationError::InvalidId {
                        kind: $kind,
                        value: value.to_string(),
                    });
                }
                Ok(Self(value))
            }

            /// Parse an identifier from a path segment.
            pub fn parse(raw: &str) -> Result<Self, ValidationError> {
                parse_positive($kind, raw).map(Self)
            }

            /// Return the raw integer value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

impl_record_id!(EventId, "event");
impl_record_id!(FileId, "file");
