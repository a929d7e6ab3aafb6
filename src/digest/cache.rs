//! Memoizing wrapper around a digest source
//!
//! Entries are keyed by file path and validated against a fingerprint of the
//! file's metadata, so a file modified since it was cached is digested again.
//! The in-memory map can be backed by a sled tree so digests survive across
//! runs.

use crate::digest::source::DigestSource;
use crate::error::ChecksumError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

/// Metadata snapshot used to decide whether a cached digest is still valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub size: u64,
    pub mtime_secs: u64,
    pub mtime_nanos: u32,
    pub inode: u64,
}

impl Fingerprint {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let (mtime_secs, mtime_nanos) = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| (d.as_secs(), d.subsec_nanos()))
            .unwrap_or((0, 0));
        Self {
            size: metadata.len(),
            mtime_secs,
            mtime_nanos,
            inode: inode(metadata),
        }
    }
}

#[cfg(unix)]
fn inode(metadata: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn inode(_metadata: &Metadata) -> u64 {
    0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedDigest {
    fingerprint: Fingerprint,
    digest: String,
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Digest source that memoizes another source by path
pub struct MemoizingSource<S> {
    inner: S,
    memory: RwLock<HashMap<PathBuf, CachedDigest>>,
    store: Option<sled::Tree>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: DigestSource> MemoizingSource<S> {
    /// Memoize in process memory only
    pub fn in_memory(inner: S) -> Self {
        Self {
            inner,
            memory: RwLock::new(HashMap::new()),
            store: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Memoize in memory and in a sled database at `path`.
    ///
    /// `namespace` separates digests produced by different algorithms.
    pub fn persistent<P: AsRef<Path>>(
        inner: S,
        path: P,
        namespace: &str,
    ) -> Result<Self, ChecksumError> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            ChecksumError::Cache(format!(
                "Failed to open digest cache {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        let tree = db.open_tree(namespace).map_err(|e| {
            ChecksumError::Cache(format!("Failed to open cache tree {}: {}", namespace, e))
        })?;
        debug!(path = %path.as_ref().display(), namespace, "Opened persistent digest cache");
        let mut source = Self::in_memory(inner);
        source.store = Some(tree);
        Ok(source)
    }

    /// Default location for the persistent cache
    pub fn default_store_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "dirdigest")
            .map(|dirs| dirs.cache_dir().join("digests.sled"))
    }

    /// Drop every cached digest, in memory and on disk
    pub fn clear(&self) -> Result<(), ChecksumError> {
        self.memory.write().clear();
        if let Some(store) = &self.store {
            store
                .clear()
                .map_err(|e| ChecksumError::Cache(format!("Failed to clear cache: {}", e)))?;
        }
        Ok(())
    }

    /// Persist pending writes of the on-disk store
    pub fn flush(&self) -> Result<(), ChecksumError> {
        if let Some(store) = &self.store {
            store
                .flush()
                .map_err(|e| ChecksumError::Cache(format!("Failed to flush cache: {}", e)))?;
        }
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn lookup(&self, path: &Path, fingerprint: &Fingerprint) -> Option<String> {
        if let Some(cached) = self.memory.read().get(path) {
            if cached.fingerprint == *fingerprint {
                return Some(cached.digest.clone());
            }
        }

        let store = self.store.as_ref()?;
        let bytes = match store.get(store_key(path)) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(path = %path.display(), "Digest cache read failed: {}", e);
                return None;
            }
        };
        let cached: CachedDigest = match bincode::deserialize(&bytes) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(path = %path.display(), "Discarding corrupt cache entry: {}", e);
                return None;
            }
        };
        if cached.fingerprint != *fingerprint {
            return None;
        }
        let digest = cached.digest.clone();
        self.memory.write().insert(path.to_path_buf(), cached);
        Some(digest)
    }

    fn remember(&self, path: &Path, cached: CachedDigest) {
        if let Some(store) = &self.store {
            match bincode::serialize(&cached) {
                Ok(bytes) => {
                    if let Err(e) = store.insert(store_key(path), bytes) {
                        warn!(path = %path.display(), "Digest cache write failed: {}", e);
                    }
                }
                Err(e) => warn!(path = %path.display(), "Failed to encode cache entry: {}", e),
            }
        }
        self.memory.write().insert(path.to_path_buf(), cached);
    }
}

/// Raw path bytes, so names that are not UTF-8 never share a key
fn store_key(path: &Path) -> &[u8] {
    path.as_os_str().as_encoded_bytes()
}

impl<S: DigestSource> DigestSource for MemoizingSource<S> {
    fn digest_file(&self, path: &Path) -> io::Result<String> {
        let fingerprint = Fingerprint::from_metadata(&std::fs::metadata(path)?);
        if let Some(digest) = self.lookup(path, &fingerprint) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(digest);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let digest = self.inner.digest_file(path)?;
        self.remember(
            path,
            CachedDigest {
                fingerprint,
                digest: digest.clone(),
            },
        );
        Ok(digest)
    }
}
