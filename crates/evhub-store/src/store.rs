//! # File Store
//!
//! Filesystem-backed content-addressed store for uploaded files.
//!
//! ## Write Path
//!
//! The upload stream is read exactly once. Each chunk is fed to SHA-256 and
//! written to a spool file created inside the data root. Once the stream is
//! exhausted the digest determines the final path, the two shard directories
//! are created if missing, and the spool file is renamed over the
//! destination. The rename is atomic on the same filesystem, so a concurrent
//! reader sees either the previous file or the complete new one, and a
//! failure at any step leaves nothing at the destination.
//!
//! Uploading identical bytes under the same extension replaces the existing
//! file with identical content. No reference counting is kept.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use evhub_core::{sha256_digest, ContentDigest, Sha256Hasher};
use subtle::ConstantTimeEq;

use crate::error::StoreError;
use crate::path::{extension_of, StoragePath};

/// Permission bits for the data root and shard directories.
pub const DIR_MODE: u32 = 0o755;

/// Permission bits for stored files.
pub const FILE_MODE: u32 = 0o644;

/// Filename prefix of in-flight spool files in the data root.
pub const SPOOL_PREFIX: &str = ".tmp-";

const COPY_BUF_LEN: usize = 64 * 1024;

/// Result of a successful [`FileStore::store_file`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Where the content now lives, relative to the data root.
    pub path: StoragePath,
    /// The original client filename, for display.
    pub display_name: String,
    /// Number of bytes written.
    pub size: u64,
}

impl StoredFile {
    /// The `/`-separated relative path to persist alongside the owning record.
    pub fn relative_path(&self) -> String {
        self.path.as_relative()
    }

    /// The content digest of the stored bytes.
    pub fn digest(&self) -> &ContentDigest {
        self.path.digest()
    }

    /// Split into `(relative_path, display_name)`.
    pub fn into_parts(self) -> (String, String) {
        (self.path.as_relative(), self.display_name)
    }
}

/// A content-addressed upload store rooted at a data directory.
///
/// Holds no state beyond the root path; cloning is cheap and clones share
/// the same directory tree.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the given directory without touching disk.
    ///
    /// Use [`FileStore::open`] at startup to make sure the root exists.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store, ensuring the data root exists.
    ///
    /// Missing parents are created. An existing directory is accepted as-is.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(root);
        store.ensure_root()?;
        Ok(store)
    }

    /// Return the data root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the data root exists with standard directory permissions.
    pub fn ensure_root(&self) -> Result<(), StoreError> {
        let mut builder = dir_builder();
        builder.recursive(true);
        match builder.create(&self.root) {
            Ok(()) => Ok(()),
            Err(_) if self.root.is_dir() => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::NotADirectory(self.root.clone()))
            }
            Err(source) => Err(StoreError::CreateDir {
                path: self.root.clone(),
                source,
            }),
        }
    }

    /// Absolute location of a storage path under this store's root.
    pub fn absolute_path(&self, path: &StoragePath) -> PathBuf {
        self.root.join(path.to_path_buf())
    }

    /// Store an upload and return where it landed.
    ///
    /// Reads `reader` to the end exactly once, hashing while spooling, then
    /// moves the content to `{root}/{aaa}/{bbb}/{rest}.{ext}`. The returned
    /// path depends only on the content and the extension of `filename`.
    pub fn store_file<R: Read>(&self, mut reader: R, filename: &str) -> Result<StoredFile, StoreError> {
        let extension = extension_of(filename)?.to_string();

        let mut spool = tempfile::Builder::new()
            .prefix(SPOOL_PREFIX)
            .tempfile_in(&self.root)
            .map_err(|source| StoreError::Write {
                path: self.root.clone(),
                source,
            })?;

        let mut hasher = Sha256Hasher::new();
        let mut buf = vec![0u8; COPY_BUF_LEN];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(StoreError::SourceRead(e)),
            };
            hasher.update(&buf[..n]);
            spool
                .write_all(&buf[..n])
                .map_err(|source| StoreError::Write {
                    path: spool.path().to_path_buf(),
                    source,
                })?;
        }

        let size = hasher.len();
        let path = StoragePath::from_parts(hasher.finalize(), &extension)?;
        self.ensure_shard_dirs(&path)?;

        let dest = self.absolute_path(&path);
        let spool_err = |source: std::io::Error| StoreError::Write {
            path: dest.clone(),
            source,
        };
        spool.flush().map_err(spool_err)?;
        set_file_mode(spool.as_file()).map_err(spool_err)?;
        spool.as_file().sync_all().map_err(spool_err)?;
        // A failed persist hands the spool file back inside the error; dropping
        // it removes the file.
        spool.persist(&dest).map_err(|e| spool_err(e.error))?;

        Ok(StoredFile {
            path,
            display_name: filename.to_string(),
            size,
        })
    }

    /// Store an in-memory upload. Convenience wrapper over [`FileStore::store_file`].
    pub fn store_bytes(&self, content: &[u8], filename: &str) -> Result<StoredFile, StoreError> {
        self.store_file(content, filename)
    }

    /// Create both shard directories for `path`, returning the innermost.
    ///
    /// A directory that already exists, including one created concurrently
    /// by another upload, counts as success.
    pub fn ensure_shard_dirs(&self, path: &StoragePath) -> Result<PathBuf, StoreError> {
        let mut dir = self.root.clone();
        for shard in path.shards() {
            dir.push(shard);
            ensure_dir(&dir)?;
        }
        Ok(dir)
    }

    /// Whether a regular file exists at `path`.
    pub fn contains(&self, path: &StoragePath) -> bool {
        self.absolute_path(path).is_file()
    }

    /// Open the stored file for reading. Returns `Ok(None)` if absent.
    pub fn open_reader(&self, path: &StoragePath) -> Result<Option<File>, StoreError> {
        match File::open(self.absolute_path(path)) {
            Ok(f) => Ok(Some(f)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a stored file and verify it still hashes to its path's digest.
    ///
    /// Returns `Ok(None)` if nothing is stored at `path`.
    pub fn resolve(&self, path: &StoragePath) -> Result<Option<Vec<u8>>, StoreError> {
        let abs = self.absolute_path(path);
        let bytes = match fs::read(&abs) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let recomputed = sha256_digest(&bytes);
        if !bool::from(recomputed.as_bytes().ct_eq(path.digest().as_bytes())) {
            return Err(StoreError::Integrity {
                path: abs,
                expected: path.digest().to_hex(),
                actual: recomputed.to_hex(),
            });
        }
        Ok(Some(bytes))
    }
}

fn dir_builder() -> fs::DirBuilder {
    #[allow(unused_mut)]
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder
}

fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    match dir_builder().create(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            if dir.is_dir() {
                Ok(())
            } else {
                Err(StoreError::NotADirectory(dir.to_path_buf()))
            }
        }
        Err(source) => Err(StoreError::CreateDir {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

#[cfg(unix)]
fn set_file_mode(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(FILE_MODE))
}

#[cfg(not(unix))]
fn set_file_mode(_file: &File) -> std::io::Result<()> {
    Ok(())
}
