//! Configuration System
//!
//! Layered configuration: built-in defaults, the global config file, an
//! explicit config file, then `DIRDIGEST__*` environment variables. CLI flags
//! are applied on top by the command router. Only `walk.algorithm` changes
//! digest values; every other setting affects speed or diagnostics.

use crate::digest::DigestAlgorithm;
use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::walk::{default_parallelism, ErrorPolicy, Strategy, DEFAULT_MAX_OPEN_FILES};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirDigestConfig {
    #[serde(default)]
    pub walk: WalkConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How trees are walked and hashed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkConfig {
    #[serde(default)]
    pub strategy: Strategy,

    /// Worker threads or tasks
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Upper bound on simultaneously open files
    #[serde(default = "default_max_open_files")]
    pub max_open_files: usize,

    #[serde(default)]
    pub error_policy: ErrorPolicy,

    #[serde(default)]
    pub algorithm: DigestAlgorithm,
}

fn default_max_open_files() -> usize {
    DEFAULT_MAX_OPEN_FILES
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            parallelism: default_parallelism(),
            max_open_files: default_max_open_files(),
            error_policy: ErrorPolicy::default(),
            algorithm: DigestAlgorithm::default(),
        }
    }
}

impl WalkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallelism == 0 {
            return Err(ConfigError::Invalid(
                "walk.parallelism must be at least 1".to_string(),
            ));
        }
        if self.max_open_files == 0 {
            return Err(ConfigError::Invalid(
                "walk.max_open_files must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Memoization of file digests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    /// sled database location; in-memory only when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Drop previously cached digests before each run
    #[serde(default = "default_true")]
    pub clear_on_start: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: None,
            clear_on_start: default_true(),
        }
    }
}

impl DirDigestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.walk.validate()
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("Failed to serialize configuration: {}", e)))
    }
}
