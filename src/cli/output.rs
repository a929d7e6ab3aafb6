//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ChecksumError, CliError};

/// Map command errors to the message printed on stderr
pub fn map_error(e: &CliError) -> String {
    match e {
        CliError::Checksum(ChecksumError::Walk(walk)) => {
            format!("{} (rerun without --fail-on-error to skip it)", walk)
        }
        CliError::Checksum(ChecksumError::Structural(s)) => {
            format!("{} (was the tree modified during the walk?)", s)
        }
        other => other.to_string(),
    }
}
