//! CLI route: single route table and run context. Dispatches to the checksummer, timing
//! harness, and layout tools, then to presentation.

use crate::bench::run_timings;
use crate::checksum::Checksummer;
use crate::cli::parse::{Commands, ReportFormat, WalkArgs};
use crate::cli::presentation::{format_checksum, format_reports, format_tree_stats};
use crate::config::{CacheConfig, ConfigLoader, DirDigestConfig, WalkConfig};
use crate::error::CliError;
use crate::layout::{create_tree, Layout, TreeStats};
use crate::walk::{ErrorPolicy, Strategy};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Runtime context for CLI execution: the loaded configuration.
pub struct RunContext {
    config: DirDigestConfig,
}

impl RunContext {
    /// Load configuration (global file, then `config_path`, then environment)
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, CliError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(Self { config })
    }

    pub fn with_config(config: DirDigestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DirDigestConfig {
        &self.config
    }

    /// Run a command and return its stdout text
    pub fn execute(&self, command: &Commands) -> Result<String, CliError> {
        let started = Instant::now();
        let result = match command {
            Commands::Checksum { dir, walk, stats } => self.handle_checksum(dir, walk, *stats),
            Commands::Bench {
                dir,
                walk,
                number,
                all_strategies,
                format,
            } => self.handle_bench(dir, walk, *number, *all_strategies, *format),
            Commands::Mktree { dir, layout } => self.handle_mktree(dir, layout),
            Commands::Stats { dir, format } => {
                let stats = TreeStats::collect(dir).map_err(|source| CliError::Io {
                    path: dir.clone(),
                    source,
                })?;
                format_tree_stats(&stats, *format)
            }
            Commands::Config => Ok(self.config.to_toml()?),
        };
        debug!(
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    /// Configured walk and cache settings with CLI overrides applied
    fn resolve(&self, args: &WalkArgs) -> Result<(WalkConfig, CacheConfig), CliError> {
        let mut walk = self.config.walk.clone();
        let mut cache = self.config.cache.clone();

        if let Some(strategy) = args.strategy {
            walk.strategy = strategy;
        }
        if let Some(threads) = args.threads {
            walk.parallelism = threads;
        }
        if let Some(max_open_files) = args.max_open_files {
            walk.max_open_files = max_open_files;
        }
        if let Some(algorithm) = args.algorithm {
            walk.algorithm = algorithm;
        }
        if args.fail_on_error {
            walk.error_policy = ErrorPolicy::Fail;
        }
        if args.cache_files {
            cache.enabled = true;
        }
        if args.no_clear_cache {
            cache.clear_on_start = false;
        }
        if let Some(path) = &args.cache_path {
            cache.path = Some(path.clone());
        }
        walk.validate()?;
        Ok((walk, cache))
    }

    fn handle_checksum(&self, dir: &Path, args: &WalkArgs, stats: bool) -> Result<String, CliError> {
        let (walk, cache) = self.resolve(args)?;
        let checksummer = Checksummer::from_config(&walk, &cache)?;
        let outcome = checksummer.checksum_with_stats(dir)?;
        Ok(format_checksum(&outcome, stats))
    }

    fn handle_bench(
        &self,
        dir: &Path,
        args: &WalkArgs,
        number: usize,
        all_strategies: bool,
        format: ReportFormat,
    ) -> Result<String, CliError> {
        let (walk, cache) = self.resolve(args)?;
        let strategies: Vec<Strategy> = if all_strategies {
            Strategy::ALL.to_vec()
        } else {
            vec![walk.strategy]
        };

        let mut reports = Vec::with_capacity(strategies.len());
        for strategy in strategies {
            let walk = WalkConfig {
                strategy,
                ..walk.clone()
            };
            let checksummer = Checksummer::from_config(&walk, &cache)?;
            reports.push(run_timings(&checksummer, dir, number)?);
        }
        format_reports(&reports, format)
    }

    fn handle_mktree(&self, dir: &Path, layout_path: &Path) -> Result<String, CliError> {
        let text = std::fs::read_to_string(layout_path).map_err(|source| CliError::Io {
            path: layout_path.to_path_buf(),
            source,
        })?;
        let layout = Layout::from_json(&text)?;
        create_tree(dir, &layout)?;
        info!(
            root = %dir.display(),
            files = layout.file_count(),
            "Created tree from layout"
        );
        Ok(format!(
            "Created {} files under {}",
            layout.file_count(),
            dir.display()
        ))
    }
}
