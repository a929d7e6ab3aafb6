//! Injectable digest sources
//!
//! Walkers never hash files themselves; they call through a [`DigestSource`]
//! so that memoization (or test doubles) can be layered in without touching
//! the concurrency code.

use std::io;
use std::path::Path;
use std::sync::Arc;

/// Produces the leaf digest for a single file
pub trait DigestSource: Send + Sync {
    fn digest_file(&self, path: &Path) -> io::Result<String>;
}

impl<S: DigestSource + ?Sized> DigestSource for Arc<S> {
    fn digest_file(&self, path: &Path) -> io::Result<String> {
        (**self).digest_file(path)
    }
}

impl<S: DigestSource + ?Sized> DigestSource for Box<S> {
    fn digest_file(&self, path: &Path) -> io::Result<String> {
        (**self).digest_file(path)
    }
}

/// Shared handle used by walkers
pub type SharedSource = Arc<dyn DigestSource>;
