//! Timing harness: repeated checksum runs summarized as a report
//!
//! The first call is reported separately because it runs against cold
//! caches; the average covers the remaining calls, or the single call when
//! only one was made.

use crate::checksum::Checksummer;
use crate::error::ChecksumError;
use chrono::{DateTime, Utc};
use comfy_table::Table;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Summary of `number` checksum calls against one tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingReport {
    pub dirpath: String,
    pub strategy: String,
    pub parallelism: usize,
    pub caching_files: bool,
    pub number: usize,
    /// Seconds taken by the first call
    pub first_call: Option<f64>,
    /// Mean seconds per call, excluding the first when `number > 1`
    pub avgtime: f64,
    pub digest: String,
    pub started_at: DateTime<Utc>,
}

pub const CSV_HEADER: &str =
    "dirpath,strategy,parallelism,caching_files,number,first_call,avgtime,digest,started_at";

impl TimingReport {
    /// One JSON object per line
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// One CSV record matching [`CSV_HEADER`]
    pub fn to_csv_record(&self) -> String {
        format!(
            "{},{},{},{},{},{},{:.6},{},{}",
            csv_field(&self.dirpath),
            self.strategy,
            self.parallelism,
            self.caching_files,
            self.number,
            self.first_call.map(|t| format!("{:.6}", t)).unwrap_or_default(),
            self.avgtime,
            self.digest,
            self.started_at.to_rfc3339(),
        )
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Call `checksummer.checksum(root)` `number` times (at least once)
pub fn run_timings(
    checksummer: &Checksummer,
    root: &Path,
    number: usize,
) -> Result<TimingReport, ChecksumError> {
    let number = number.max(1);
    let started_at = Utc::now();

    let mut durations = Vec::with_capacity(number);
    let mut digest = String::new();
    for run in 0..number {
        let start = Instant::now();
        let result = checksummer.checksum(root)?;
        let elapsed = start.elapsed().as_secs_f64();
        if run > 0 && result != digest {
            return Err(ChecksumError::Runtime(format!(
                "Digest changed between runs: {} then {}",
                digest, result
            )));
        }
        digest = result;
        durations.push(elapsed);
    }

    let first_call = durations.first().copied();
    let rest = if durations.len() > 1 {
        &durations[1..]
    } else {
        &durations[..]
    };
    let avgtime = rest.iter().sum::<f64>() / rest.len() as f64;

    let report = TimingReport {
        dirpath: root.display().to_string(),
        strategy: checksummer.strategy().to_string(),
        parallelism: checksummer.parallelism(),
        caching_files: checksummer.caching_files(),
        number,
        first_call,
        avgtime,
        digest,
        started_at,
    };
    info!(
        strategy = %report.strategy,
        number,
        first_call = ?report.first_call,
        avgtime = report.avgtime,
        "Timing run finished"
    );
    Ok(report)
}

/// Render reports as a table
pub fn render_table(reports: &[TimingReport]) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec![
        "Directory",
        "Strategy",
        "Parallelism",
        "Caching Files",
        "Runs",
        "First Call (s)",
        "Average (s)",
        "Digest",
    ]);
    for r in reports {
        table.add_row(vec![
            r.dirpath.clone(),
            r.strategy.clone(),
            r.parallelism.to_string(),
            r.caching_files.to_string(),
            r.number.to_string(),
            r.first_call
                .map(|t| format!("{:.4}", t))
                .unwrap_or_else(|| "-".to_string()),
            format!("{:.4}", r.avgtime),
            r.digest.clone(),
        ]);
    }
    table.to_string()
}
