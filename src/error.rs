//! Error types for directory digest computation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while walking a tree: a directory that cannot be listed or
/// a file that cannot be read.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Error scanning directory {path:?}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error digesting file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File name is not valid UTF-8: {path:?}")]
    InvalidName { path: PathBuf },
}

impl WalkError {
    pub fn scan(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WalkError::Scan {
            path: path.into(),
            source,
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WalkError::Read {
            path: path.into(),
            source,
        }
    }

    /// Path of the directory or file that failed
    pub fn path(&self) -> &std::path::Path {
        match self {
            WalkError::Scan { path, .. }
            | WalkError::Read { path, .. }
            | WalkError::InvalidName { path } => path,
        }
    }
}

/// Violations of the digest tree invariants.
///
/// These indicate a walker bug or a tree that was mutated while it was being
/// walked, and always abort the whole checksum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("File {0} encountered twice")]
    DuplicatePath(String),

    #[error("Path type conflict for {0}")]
    TypeConflict(String),

    #[error("Invalid relative path: {0:?}")]
    InvalidPath(String),
}

/// Errors returned by a checksum operation
#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("Checksum cancelled")]
    Cancelled,

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Digest cache error: {0}")]
    Cache(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reading a fixture layout or creating the tree it describes
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid layout: {0}")]
    Invalid(String),

    #[error("Failed to create {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to format output: {0}")]
    Output(String),
}
