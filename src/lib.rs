//! dirdigest: Deterministic Directory Tree Digests
//!
//! Computes a single digest for a directory tree from the contents of its
//! regular files and the shape of its directories. Several concurrent walk
//! strategies produce the same digest for the same tree; they differ only in
//! how listing and hashing work is scheduled.

pub mod bench;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod layout;
pub mod logging;
pub mod tree;
pub mod types;
pub mod walk;

pub use checksum::{ChecksumOutcome, Checksummer};
pub use digest::{DigestAlgorithm, DigestSource, LeafDigester};
pub use error::{ChecksumError, StructuralError, WalkError};
pub use tree::{compile_checksum, DigestCompiler};
pub use types::FileDigest;
pub use walk::{DigestStream, DigestWalker, ErrorPolicy, Strategy, WalkContext};
