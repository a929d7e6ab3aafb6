//! Relative path handling for digest trees
//!
//! Paths inside a digest tree are slash-separated and relative to the walk
//! root, independent of the platform separator.

use crate::error::{StructuralError, WalkError};
use std::io;
use std::path::{Component, Path};

/// Render `path` relative to `root` as a slash-separated string.
///
/// Names are never converted lossily: a component that is not valid UTF-8
/// fails with [`WalkError::InvalidName`], so two distinct names can never
/// collapse into one key.
pub fn relative_path(root: &Path, path: &Path) -> Result<String, WalkError> {
    let outside = || {
        WalkError::read(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "path is outside the walk root"),
        )
    };
    let rel = path.strip_prefix(root).map_err(|_| outside())?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(name) => match name.to_str() {
                Some(name) => parts.push(name),
                None => {
                    return Err(WalkError::InvalidName {
                        path: path.to_path_buf(),
                    })
                }
            },
            Component::CurDir => continue,
            _ => return Err(outside()),
        }
    }
    Ok(parts.join("/"))
}

/// Split a relative path into its directory components and leaf name
pub fn split_relative(relpath: &str) -> Result<(Vec<&str>, &str), StructuralError> {
    let mut components: Vec<&str> = relpath.split('/').collect();
    if components
        .iter()
        .any(|c| c.is_empty() || *c == "." || *c == "..")
    {
        return Err(StructuralError::InvalidPath(relpath.to_string()));
    }
    // split always yields at least one element, and empty ones were rejected
    let name = components
        .pop()
        .ok_or_else(|| StructuralError::InvalidPath(relpath.to_string()))?;
    Ok((components, name))
}
