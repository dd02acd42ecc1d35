//! Statistics over extracted benchmark runs.
//!
//! This module provides:
//! - Per-benchmark summaries (average, highest, lowest)
//! - PassMark score splitting
//! - The cross-benchmark overall average

pub mod aggregate;

pub use aggregate::{
    aggregate, overall_average, run_mean, AggregateError, PassmarkScores, RunStats, Summary,
};
