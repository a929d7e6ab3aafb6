//! CLI domain: parse, route, output, and presentation only.
//! Route dispatches to the checksummer, timing harness, and layout tools.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat, ReportFormat, WalkArgs};
pub use presentation::{format_checksum, format_reports, format_tree_stats};
pub use route::RunContext;
