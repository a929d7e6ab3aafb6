//! Digest compiler: folds an unordered stream of file digests into a tree

use crate::digest::combine::Combiner;
use crate::error::StructuralError;
use crate::tree::entry::{DirectoryNode, Entry, FileNode};
use crate::tree::path;
use crate::types::FileDigest;
use std::collections::btree_map;
use tracing::trace;

/// Accumulates `(relative path, digest)` pairs into a directory tree.
///
/// Owned by the single consumer of a walker's output, so it needs no
/// synchronization. Pairs may arrive in any order.
#[derive(Debug, Clone, Default)]
pub struct DigestCompiler {
    root: DirectoryNode,
    files: usize,
}

impl DigestCompiler {
    pub fn new() -> Self {
        Self {
            root: DirectoryNode::root(),
            files: 0,
        }
    }

    /// Insert one file, creating intermediate directories on first reference.
    ///
    /// Fails on a path seen twice or a name used both as file and directory;
    /// nothing is overwritten.
    pub fn add(&mut self, relpath: &str, digest: String) -> Result<(), StructuralError> {
        let (dirs, name) = path::split_relative(relpath)?;

        let mut dir = &mut self.root;
        let mut prefix = String::new();
        for component in dirs {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(component);
            let child = dir
                .children
                .entry(component.to_string())
                .or_insert_with(|| Entry::Directory(DirectoryNode::new(prefix.clone())));
            dir = match child {
                Entry::Directory(d) => d,
                Entry::File(_) => return Err(StructuralError::TypeConflict(prefix)),
            };
        }

        match dir.children.entry(name.to_string()) {
            btree_map::Entry::Occupied(existing) => match existing.get() {
                Entry::File(_) => Err(StructuralError::DuplicatePath(relpath.to_string())),
                Entry::Directory(_) => Err(StructuralError::TypeConflict(relpath.to_string())),
            },
            btree_map::Entry::Vacant(slot) => {
                trace!(path = relpath, "Added file to digest tree");
                slot.insert(Entry::File(FileNode {
                    path: relpath.to_string(),
                    digest,
                }));
                self.files += 1;
                Ok(())
            }
        }
    }

    pub fn add_file(&mut self, file: FileDigest) -> Result<(), StructuralError> {
        self.add(&file.path, file.digest)
    }

    /// Number of files inserted so far
    pub fn file_count(&self) -> usize {
        self.files
    }

    pub fn root(&self) -> &DirectoryNode {
        &self.root
    }

    /// Digest of the whole tree
    pub fn digest(&self, combiner: &dyn Combiner) -> String {
        self.root.digest(combiner)
    }
}

/// Compile a complete collection of file digests into the root digest
pub fn compile_checksum<I>(iter: I, combiner: &dyn Combiner) -> Result<String, StructuralError>
where
    I: IntoIterator<Item = FileDigest>,
{
    let mut compiler = DigestCompiler::new();
    for file in iter {
        compiler.add_file(file)?;
    }
    Ok(compiler.digest(combiner))
}
