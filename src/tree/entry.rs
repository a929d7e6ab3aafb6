//! Nodes of the digest tree assembled from a walker's output

use crate::digest::combine::{Combiner, DigestMap};
use std::collections::BTreeMap;

/// A node in the digest tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File(FileNode),
    Directory(DirectoryNode),
}

impl Entry {
    /// Slash-separated path relative to the walk root
    pub fn path(&self) -> &str {
        match self {
            Entry::File(f) => &f.path,
            Entry::Directory(d) => &d.path,
        }
    }
}

/// A file leaf; immutable once created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub path: String,
    pub digest: String,
}

/// A directory and its named children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryNode {
    pub path: String,
    pub children: BTreeMap<String, Entry>,
}

impl DirectoryNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            children: BTreeMap::new(),
        }
    }

    /// The walk root: empty relative path
    pub fn root() -> Self {
        Self::new("")
    }

    /// Compute this directory's digest bottom-up.
    ///
    /// Every child directory is digested first; the combiner is then called
    /// once with the file and subdirectory mappings of this level.
    pub fn digest(&self, combiner: &dyn Combiner) -> String {
        let mut files = DigestMap::new();
        let mut dirs = DigestMap::new();
        for (name, child) in &self.children {
            match child {
                Entry::File(f) => {
                    files.insert(name.clone(), f.digest.clone());
                }
                Entry::Directory(d) => {
                    dirs.insert(name.clone(), d.digest(combiner));
                }
            }
        }
        combiner.combine(&files, &dirs)
    }

    /// Number of files anywhere below this directory
    pub fn file_count(&self) -> usize {
        self.children
            .values()
            .map(|child| match child {
                Entry::File(_) => 1,
                Entry::Directory(d) => d.file_count(),
            })
            .sum()
    }
}
