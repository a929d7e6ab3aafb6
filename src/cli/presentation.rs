//! CLI presentation: text, JSON, CSV, and table formatters.

use crate::bench::{render_table, TimingReport, CSV_HEADER};
use crate::checksum::ChecksumOutcome;
use crate::cli::parse::{OutputFormat, ReportFormat};
use crate::error::CliError;
use crate::layout::TreeStats;
use comfy_table::Table;

pub fn format_checksum(outcome: &ChecksumOutcome, with_stats: bool) -> String {
    if !with_stats {
        return outcome.digest.clone();
    }
    format!(
        "{}\n  Directories scanned: {}\n  Files digested: {}\n  Skipped errors: {}",
        outcome.digest,
        outcome.stats.dirs_scanned,
        outcome.stats.files_digested,
        outcome.stats.errors
    )
}

pub fn format_reports(reports: &[TimingReport], format: ReportFormat) -> Result<String, CliError> {
    match format {
        ReportFormat::Json => {
            let lines = reports
                .iter()
                .map(|r| r.to_json_line())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| CliError::Output(e.to_string()))?;
            Ok(lines.join("\n"))
        }
        ReportFormat::Csv => {
            let mut lines = vec![CSV_HEADER.to_string()];
            lines.extend(reports.iter().map(TimingReport::to_csv_record));
            Ok(lines.join("\n"))
        }
        ReportFormat::Table => Ok(render_table(reports)),
    }
}

pub fn format_tree_stats(stats: &TreeStats, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(stats).map_err(|e| CliError::Output(e.to_string()))
        }
        OutputFormat::Text => {
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Files", "Directories", "Bytes"]);
            table.add_row(vec![
                stats.files.to_string(),
                stats.directories.to_string(),
                stats.bytes.to_string(),
            ]);
            Ok(table.to_string())
        }
    }
}
