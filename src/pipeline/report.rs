use std::fmt;

use super::ExtractError;
use crate::bench::BenchmarkType;

/// A benchmark folder that could not be updated this run.
#[derive(Debug)]
pub struct UnitFailure {
    pub iso: String,
    pub bench: BenchmarkType,
    pub error: ExtractError,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.bench, self.iso, self.error)
    }
}

/// Outcome of one update run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub updated: Vec<(String, BenchmarkType)>,
    pub up_to_date: usize,
    /// Folders without any valid screenshot
    pub missing: usize,
    pub failures: Vec<UnitFailure>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// One-line summary for the end of a run.
    pub fn summary(&self) -> String {
        format!(
            "{} updated, {} up to date, {} without screenshots, {} failed",
            self.updated.len(),
            self.up_to_date,
            self.missing,
            self.failures.len()
        )
    }
}
