//! Merge rules: defaults first, every later source overrides earlier ones.

use crate::walk::{default_parallelism, DEFAULT_MAX_OPEN_FILES};
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with defaults applied
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("walk.strategy", "pool")?
        .set_default("walk.parallelism", default_parallelism() as i64)?
        .set_default("walk.max_open_files", DEFAULT_MAX_OPEN_FILES as i64)?
        .set_default("walk.error_policy", "skip")?
        .set_default("walk.algorithm", "md5")?
        .set_default("cache.enabled", false)?
        .set_default("cache.clear_on_start", true)
}
