//! Core value types shared between walkers and the digest compiler

use serde::{Deserialize, Serialize};

/// One leaf result emitted by a walker: a file's slash-separated path
/// relative to the walk root, and its digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDigest {
    pub path: String,
    pub digest: String,
}

impl FileDigest {
    pub fn new(path: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            digest: digest.into(),
        }
    }
}
