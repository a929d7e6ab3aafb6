//! Directory listing behind an injectable seam

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One immediate child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Lists the immediate entries of a directory
pub trait DirectoryLister: Send + Sync {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;

    /// Whether `root` can start a walk at all
    fn is_walkable(&self, root: &Path) -> bool {
        is_walkable_root(root)
    }
}

impl<L: DirectoryLister + ?Sized> DirectoryLister for Arc<L> {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        (**self).list(dir)
    }

    fn is_walkable(&self, root: &Path) -> bool {
        (**self).is_walkable(root)
    }
}

pub type SharedLister = Arc<dyn DirectoryLister>;

/// Lists directories from the local filesystem.
///
/// Symbolic links are classified by their target: a link to a directory is
/// walked as a directory, anything else (including a dangling link) is
/// treated as a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLister;

impl DirectoryLister for FsLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            let is_dir = if file_type.is_symlink() {
                fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false)
            } else {
                file_type.is_dir()
            };
            entries.push(DirEntry { path, is_dir });
        }
        Ok(entries)
    }
}

/// A walk root must be an existing directory; anything else walks as empty
pub fn is_walkable_root(root: &Path) -> bool {
    root.is_dir()
}
