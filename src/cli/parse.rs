//! CLI parse: clap types for dirdigest. No behavior; definitions only.

use crate::digest::DigestAlgorithm;
use crate::walk::Strategy;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dirdigest - deterministic content digests for directory trees
#[derive(Parser, Debug)]
#[command(name = "dirdigest", version)]
#[command(about = "Deterministic content digests for directory trees")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (layered over the global config file)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path when output is "file"
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

/// Walk and cache options shared by `checksum` and `bench`; unset options
/// keep their configured values
#[derive(Args, Debug, Clone, Default)]
pub struct WalkArgs {
    /// Walking strategy (sequential, threaded, pool, cooperative, fanout, recursive)
    #[arg(short = 's', long)]
    pub strategy: Option<Strategy>,

    /// Worker threads or tasks
    #[arg(short = 'T', long)]
    pub threads: Option<usize>,

    /// Maximum number of files open at once
    #[arg(long)]
    pub max_open_files: Option<usize>,

    /// Hash algorithm (md5, blake3)
    #[arg(long)]
    pub algorithm: Option<DigestAlgorithm>,

    /// Abort on the first unreadable directory or file instead of skipping it
    #[arg(long)]
    pub fail_on_error: bool,

    /// Memoize file digests
    #[arg(short = 'C', long)]
    pub cache_files: bool,

    /// Keep digests cached by earlier runs
    #[arg(long)]
    pub no_clear_cache: bool,

    /// Location of the persistent digest cache
    #[arg(long)]
    pub cache_path: Option<PathBuf>,
}

/// Timing report output format
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// JSON Lines
    #[default]
    Json,
    Table,
    Csv,
}

/// Text or JSON output
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the digest of a directory tree
    Checksum {
        dir: PathBuf,

        #[command(flatten)]
        walk: WalkArgs,

        /// Also print walk counters
        #[arg(long)]
        stats: bool,
    },
    /// Time repeated checksums of a directory tree
    Bench {
        dir: PathBuf,

        #[command(flatten)]
        walk: WalkArgs,

        /// Number of checksum calls per strategy
        #[arg(short = 'n', long, default_value_t = 10)]
        number: usize,

        /// Run every strategy instead of only the selected one
        #[arg(long, conflicts_with = "strategy")]
        all_strategies: bool,

        #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,
    },
    /// Create a synthetic tree from a JSON layout file
    Mktree {
        dir: PathBuf,
        layout: PathBuf,
    },
    /// Count files, directories, and bytes under a directory
    Stats {
        dir: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the effective configuration as TOML
    Config,
}
