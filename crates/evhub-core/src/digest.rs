//! # Content Digest: Content-Addressed Identifiers
//!
//! Defines `ContentDigest`, the SHA-256 fingerprint that names every stored
//! upload, and `Sha256Hasher`, the incremental form used when the content
//! arrives as a stream.
//!
//! ## Invariant
//!
//! A digest is always exactly 32 bytes and always renders as 64 lowercase
//! hex characters. Parsing accepts uppercase input but normalizes it, so two
//! digests of the same bytes compare equal regardless of how they were
//! written down.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// Length of a rendered digest in hex characters.
pub const DIGEST_HEX_LEN: usize = 64;

/// A SHA-256 content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a digest from raw bytes.
    ///
    /// Prefer [`sha256_digest()`] or [`Sha256Hasher`] for computing digests.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Return the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a 64-character hex string into a digest.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.len() != DIGEST_HEX_LEN {
            return Err(ValidationError::InvalidDigest(format!(
                "expected {DIGEST_HEX_LEN} hex chars, got {}",
                s.len()
            )));
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidDigest(
                "digest contains non-hex characters".into(),
            ));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|e| ValidationError::InvalidDigest(format!("position {}: {e}", i * 2)))?;
        }
        Ok(Self { bytes })
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Compute a SHA-256 digest over an in-memory byte slice.
pub fn sha256_digest(data: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(bytes)
}

/// Compute a SHA-256 hex string over an in-memory byte slice.
pub fn sha256_hex(data: &[u8]) -> String {
    sha256_digest(data).to_hex()
}

/// Incremental SHA-256 over content that arrives in chunks.
///
/// Implements [`std::io::Write`] so it can sit on one side of a tee while
/// the same bytes are spooled to disk.
#[derive(Clone, Default)]
pub struct Sha256Hasher {
    inner: Sha256,
    len: u64,
}

impl std::fmt::Debug for Sha256Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sha256Hasher").field("len", &self.len).finish()
    }
}

impl Sha256Hasher {
    /// Start a new digest computation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of content.
    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
        self.len += chunk.len() as u64;
    }

    /// Number of bytes fed so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether no bytes have been fed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finish and return the digest.
    pub fn finalize(self) -> ContentDigest {
        let hash = self.inner.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        ContentDigest::new(bytes)
    }
}

impl std::io::Write for Sha256Hasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
