//! Top-down digest computed by recursing over the filesystem
//!
//! No stream and no tree: each directory lists its entries, recurses into
//! subdirectories immediately, and folds the results with the combiner.
//! A subdirectory whose subtree holds no files has no digest and is left
//! out of its parent, which matches what the stream-based compiler
//! produces. The root always has a digest.

use crate::digest::combine::{Combiner, DigestMap};
use crate::error::ChecksumError;
use crate::walk::WalkContext;
use std::ffi::OsStr;
use std::path::Path;
use tracing::debug;

/// Digest of `root`, or of an empty directory if `root` cannot be walked
pub fn checksum_recursive(
    ctx: &WalkContext,
    root: &Path,
    combiner: &dyn Combiner,
) -> Result<String, ChecksumError> {
    let empty = || combiner.combine(&DigestMap::new(), &DigestMap::new());
    if !ctx.lister.is_walkable(root) {
        return Ok(empty());
    }
    debug!(root = %root.display(), "Recursive walk started");
    Ok(digest_directory(ctx, root, root, combiner)?.unwrap_or_else(empty))
}

/// `Ok(None)` when the directory contributes nothing to its parent
fn digest_directory(
    ctx: &WalkContext,
    root: &Path,
    dir: &Path,
    combiner: &dyn Combiner,
) -> Result<Option<String>, ChecksumError> {
    if ctx.is_cancelled() {
        return Err(ChecksumError::Cancelled);
    }

    let entries = match ctx.list(dir) {
        Ok(entries) => entries,
        Err(err) => {
            return match ctx.handle_error(err) {
                Some(err) => Err(err.into()),
                None => Ok(None),
            };
        }
    };

    let mut files = DigestMap::new();
    let mut dirs = DigestMap::new();
    for entry in entries {
        if entry.is_dir {
            let Some(digest) = digest_directory(ctx, root, &entry.path, combiner)? else {
                continue;
            };
            // a subtree only has a digest if one of its relative paths, this name
            // included, was valid UTF-8
            if let Some(name) = entry.path.file_name().and_then(OsStr::to_str) {
                dirs.insert(name.to_string(), digest);
            }
        } else {
            match ctx.digest(root, &entry.path) {
                Ok(file) => {
                    let name = match file.path.rsplit_once('/') {
                        Some((_, name)) => name.to_string(),
                        None => file.path.clone(),
                    };
                    files.insert(name, file.digest);
                }
                Err(err) => {
                    if let Some(err) = ctx.handle_error(err) {
                        return Err(err.into());
                    }
                }
            }
        }
    }

    if files.is_empty() && dirs.is_empty() {
        return Ok(None);
    }
    Ok(Some(combiner.combine(&files, &dirs)))
}
