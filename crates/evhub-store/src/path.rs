//! # Storage Path Derivation
//!
//! A stored upload lives at `{aaa}/{bbb}/{rest}.{ext}` relative to the data
//! root, where `aaa` and `bbb` are the first two 3-character slices of the
//! hex digest and `rest` is the remaining 58 characters. The fan-out bounds
//! each directory at 4096 entries per level.
//!
//! The extension is whatever follows the last `.` in the client filename.
//! A filename with no `.` contributes the whole name as its extension, so
//! `archive` is stored as `{rest}.archive`.

use std::path::PathBuf;

use evhub_core::{ContentDigest, DIGEST_HEX_LEN};
use serde::{Serialize, Serializer};

use crate::error::StoreError;

/// Hex characters per shard directory name.
pub const SHARD_LEN: usize = 3;

/// Number of shard directory levels.
pub const SHARD_DEPTH: usize = 2;

/// Hex characters in the leaf filename stem.
pub const LEAF_STEM_LEN: usize = DIGEST_HEX_LEN - SHARD_LEN * SHARD_DEPTH;

/// Extract the extension from a client filename using the last-dot policy.
///
/// Returns the substring after the final `.`, or the whole filename when it
/// contains no `.`. Rejects empty filenames, empty extensions, and
/// extensions containing path separators or NUL.
pub fn extension_of(filename: &str) -> Result<&str, StoreError> {
    if filename.is_empty() {
        return Err(StoreError::InvalidFilename("filename is empty".into()));
    }
    let ext = match filename.rfind('.') {
        Some(i) => &filename[i + 1..],
        None => filename,
    };
    validate_extension(ext)?;
    Ok(ext)
}

fn validate_extension(ext: &str) -> Result<(), StoreError> {
    if ext.is_empty() {
        return Err(StoreError::InvalidFilename(
            "extension after the final '.' is empty".into(),
        ));
    }
    if let Some(c) = ext.chars().find(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(StoreError::InvalidFilename(format!(
            "extension {ext:?} contains forbidden character {c:?}"
        )));
    }
    Ok(())
}

/// Location of a stored upload relative to the data root.
///
/// A pure function of the content digest and the extension: identical bytes
/// uploaded under the same extension always map to the same path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePath {
    digest: ContentDigest,
    extension: String,
}

impl StoragePath {
    /// Derive the storage path for content with the given digest, uploaded
    /// under the given client filename.
    pub fn derive(digest: &ContentDigest, filename: &str) -> Result<Self, StoreError> {
        let ext = extension_of(filename)?;
        Ok(Self {
            digest: *digest,
            extension: ext.to_string(),
        })
    }

    /// Build a storage path from a digest and an already-extracted extension.
    pub fn from_parts(digest: ContentDigest, extension: &str) -> Result<Self, StoreError> {
        validate_extension(extension)?;
        if extension.contains('.') {
            return Err(StoreError::InvalidFilename(format!(
                "extension {extension:?} must not contain '.'"
            )));
        }
        Ok(Self {
            digest,
            extension: extension.to_string(),
        })
    }

    /// Parse a relative path previously produced by [`StoragePath::as_relative`].
    pub fn parse(relative: &str) -> Result<Self, StoreError> {
        let invalid = |why: &str| StoreError::InvalidPath(format!("{relative:?}: {why}"));

        let mut parts = relative.split('/');
        let (Some(first), Some(second), Some(leaf), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected three '/'-separated segments"));
        };
        let Some((stem, extension)) = leaf.split_once('.') else {
            return Err(invalid("leaf has no extension"));
        };
        if first.len() != SHARD_LEN || second.len() != SHARD_LEN || stem.len() != LEAF_STEM_LEN {
            return Err(invalid("segment lengths do not match the shard layout"));
        }
        let hex = format!("{first}{second}{stem}");
        if !hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(invalid("digest segments must be lowercase hex"));
        }
        let digest = ContentDigest::from_hex(&hex).map_err(|e| invalid(&e.to_string()))?;
        Self::from_parts(digest, extension).map_err(|e| invalid(&e.to_string()))
    }

    /// The content digest encoded in this path.
    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    /// The extension of the leaf file, without the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The two shard directory names, outermost first.
    pub fn shards(&self) -> [String; SHARD_DEPTH] {
        let hex = self.digest.to_hex();
        [
            hex[..SHARD_LEN].to_string(),
            hex[SHARD_LEN..SHARD_LEN * 2].to_string(),
        ]
    }

    /// The leaf filename: remaining digest characters plus extension.
    pub fn leaf(&self) -> String {
        let hex = self.digest.to_hex();
        format!("{}.{}", &hex[SHARD_LEN * SHARD_DEPTH..], self.extension)
    }

    /// Render as a `/`-separated relative path, the form persisted by callers.
    pub fn as_relative(&self) -> String {
        let [first, second] = self.shards();
        format!("{first}/{second}/{}", self.leaf())
    }

    /// Render as a platform path relative to the data root.
    pub fn to_path_buf(&self) -> PathBuf {
        let [first, second] = self.shards();
        [first, second, self.leaf()].iter().collect()
    }
}

impl std::fmt::Display for StoragePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_relative())
    }
}

impl Serialize for StoragePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_relative())
    }
}
