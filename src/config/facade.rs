//! ConfigLoader: assembles sources in precedence order and validates the result

use super::merge::merge_policy;
use super::sources::{environment, explicit_file, global_file};
use super::DirDigestConfig;
use crate::error::ConfigError;
use std::path::Path;
use tracing::debug;

/// Loads [`DirDigestConfig`] from defaults, files, and the environment
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the global file, then `explicit` (if given), then
    /// `DIRDIGEST__*` environment variables
    pub fn load(explicit: Option<&Path>) -> Result<DirDigestConfig, ConfigError> {
        let mut builder = merge_policy::builder_with_defaults()?;
        builder = global_file::add_to_builder(builder)?;
        if let Some(path) = explicit {
            debug!(config_path = %path.display(), "Loading explicit configuration");
            builder = explicit_file::add_to_builder(builder, path)?;
        }
        builder = environment::add_to_builder(builder);

        let config: DirDigestConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with a single file; ignores the global file and environment
    pub fn load_from_file(path: &Path) -> Result<DirDigestConfig, ConfigError> {
        let builder = explicit_file::add_to_builder(merge_policy::builder_with_defaults()?, path)?;
        let config: DirDigestConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
