//! Digest tree assembly
//!
//! The compiler folds a walker's unordered `(path, digest)` stream into a
//! tree shaped like the filesystem and digests it bottom-up; `recursive`
//! computes the same digest top-down without a stream.

pub mod compiler;
pub mod entry;
pub mod path;
pub mod recursive;

pub use compiler::{compile_checksum, DigestCompiler};
pub use entry::{DirectoryNode, Entry, FileNode};
pub use recursive::checksum_recursive;
