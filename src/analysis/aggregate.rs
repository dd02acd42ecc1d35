//! Summary statistics over one benchmark folder's runs.
//!
//! Browser benchmarks reduce their runs to average/highest/lowest strings;
//! PassMark has no aggregation and just splits its result into named scores.

use serde::Serialize;
use thiserror::Error;

use crate::bench::BenchmarkType;
use crate::ocr::{MotionMarkScore, NormalizeError, Normalizer, ParsedValue};

#[derive(Debug, Error, PartialEq)]
pub enum AggregateError {
    #[error("no values to aggregate")]
    Empty,
    #[error(transparent)]
    Invalid(#[from] NormalizeError),
    #[error("expected 6 PassMark fields, found {found} in {text:?}")]
    FieldCount { found: usize, text: String },
}

/// Average, highest and lowest run, already formatted for storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub average: String,
    pub highest: String,
    pub lowest: String,
}

/// The six PassMark scores, in screen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassmarkScores {
    pub overall: String,
    pub cpu: String,
    pub two_d: String,
    pub three_d: String,
    pub memory: String,
    pub disk: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Stats(RunStats),
    PassMark(PassmarkScores),
}

/// Formats a MotionMark result the way it is stored and compared.
pub fn format_motionmark(score: &MotionMarkScore) -> String {
    format!("{:.2} @{}fps {:.2}%", score.score, score.fps, score.percent)
}

fn decimals(bench: BenchmarkType) -> usize {
    match bench {
        BenchmarkType::JetStream => 3,
        _ => 2,
    }
}

/// Reduces validated run values to their summary.
///
/// MotionMark's highest/lowest are the lexicographic max/min of the
/// reformatted run strings, not the numerically best run.
pub fn aggregate(
    normalizer: &Normalizer,
    bench: BenchmarkType,
    values: &[String],
) -> Result<Summary, AggregateError> {
    if values.is_empty() {
        return Err(AggregateError::Empty);
    }

    let parsed = values
        .iter()
        .map(|v| normalizer.parse(bench, v))
        .collect::<Result<Vec<_>, _>>()?;

    match bench {
        BenchmarkType::JetStream | BenchmarkType::Speedometer => {
            let numbers: Vec<f64> = parsed.iter().filter_map(number).collect();
            Ok(Summary::Stats(numeric_stats(&numbers, decimals(bench))))
        }
        BenchmarkType::MotionMark => {
            let scores: Vec<MotionMarkScore> = parsed
                .iter()
                .filter_map(|p| match p {
                    ParsedValue::MotionMark(score) => Some(*score),
                    _ => None,
                })
                .collect();
            Ok(Summary::Stats(motionmark_stats(&scores)))
        }
        BenchmarkType::PassMark => {
            // Newest run wins when more than one screenshot is configured
            let text = &values[values.len() - 1];
            match parsed.last() {
                Some(ParsedValue::PassMark(fields)) => {
                    Ok(Summary::PassMark(split_passmark(fields, text)?))
                }
                _ => Err(AggregateError::Empty),
            }
        }
    }
}

fn number(value: &ParsedValue) -> Option<f64> {
    match value {
        ParsedValue::JetStream(v) | ParsedValue::Speedometer(v) => Some(*v),
        _ => None,
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn numeric_stats(values: &[f64], precision: usize) -> RunStats {
    let highest = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lowest = values.iter().copied().fold(f64::INFINITY, f64::min);
    RunStats {
        average: format!("{:.*}", precision, mean(values)),
        highest: format!("{:.*}", precision, highest),
        lowest: format!("{:.*}", precision, lowest),
    }
}

fn motionmark_stats(scores: &[MotionMarkScore]) -> RunStats {
    let n = scores.len() as f64;
    let average = MotionMarkScore {
        score: scores.iter().map(|s| s.score).sum::<f64>() / n,
        fps: (scores.iter().map(|s| s.fps as f64).sum::<f64>() / n).round() as u32,
        percent: scores.iter().map(|s| s.percent).sum::<f64>() / n,
    };

    let formatted: Vec<String> = scores.iter().map(format_motionmark).collect();
    RunStats {
        average: format_motionmark(&average),
        highest: formatted.iter().max().cloned().unwrap_or_default(),
        lowest: formatted.iter().min().cloned().unwrap_or_default(),
    }
}

fn split_passmark(fields: &[String], text: &str) -> Result<PassmarkScores, AggregateError> {
    match fields {
        [overall, cpu, two_d, three_d, memory, disk] => Ok(PassmarkScores {
            overall: overall.clone(),
            cpu: cpu.clone(),
            two_d: two_d.clone(),
            three_d: three_d.clone(),
            memory: memory.clone(),
            disk: disk.clone(),
        }),
        _ => Err(AggregateError::FieldCount {
            found: fields.len(),
            text: text.to_string(),
        }),
    }
}

/// Headline number of a benchmark's runs, used for the overall average.
///
/// MotionMark contributes its mean score. Returns `None` for PassMark,
/// empty value lists, or values that no longer validate.
pub fn run_mean(normalizer: &Normalizer, bench: BenchmarkType, values: &[String]) -> Option<f64> {
    if !bench.counts_toward_overall() || values.is_empty() {
        return None;
    }

    let mut headline = Vec::with_capacity(values.len());
    for value in values {
        match normalizer.parse(bench, value).ok()? {
            ParsedValue::JetStream(v) | ParsedValue::Speedometer(v) => headline.push(v),
            ParsedValue::MotionMark(score) => headline.push(score.score),
            ParsedValue::PassMark(_) => return None,
        }
    }
    Some(mean(&headline))
}

/// Mean of the per-benchmark means, formatted to 2 decimals.
pub fn overall_average(means: &[f64]) -> Option<String> {
    if means.is_empty() {
        return None;
    }
    Some(format!("{:.2}", mean(means)))
}
