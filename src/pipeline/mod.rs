//! The incremental update loop.
//!
//! For every ISO folder and benchmark type the staleness gate decides whether
//! anything changed. Stale folders are fully re-extracted; a sub-record is
//! only overwritten once all its runs were read, validated and aggregated.
//! Failures are collected per (ISO, benchmark) and never stop the run.

pub mod report;

pub use report::{RunReport, UnitFailure};

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analysis::{self, AggregateError, Summary};
use crate::bench::BenchmarkType;
use crate::config::AppConfig;
use crate::ocr::{self, OcrError, Normalizer, Recognizer};
use crate::scan::{self, GateDecision, Screenshot};
use crate::store::{self, IsoRecord, RunValue, STATUS_FAILED, STATUS_SUCCESS};

/// Why one benchmark folder of one ISO could not be updated.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("reference anchor not found in {}", .image.display())]
    AnchorNotFound { image: PathBuf },
    #[error("{bench} text from {} failed validation: {text:?}", .image.display())]
    Validation {
        bench: BenchmarkType,
        image: PathBuf,
        text: String,
    },
    #[error("expected {expected} {bench} values, got {found}")]
    WrongCount {
        bench: BenchmarkType,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Restricts a run to one ISO folder and/or one benchmark type.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub folder_name: Option<String>,
    pub bench: Option<BenchmarkType>,
}

impl Filters {
    fn benches(&self) -> Vec<BenchmarkType> {
        BenchmarkType::ALL
            .into_iter()
            .filter(|b| self.bench.is_none_or(|wanted| wanted == *b))
            .collect()
    }
}

/// What happened to one benchmark folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    NoScreenshots,
    UpToDate,
    Updated,
}

/// Raw OCR text of one folder, as printed by the `extract` command.
#[derive(Debug, Clone, Serialize)]
pub struct FolderTexts {
    pub folder_name: String,
    pub values: Vec<String>,
}

/// Lists the ISO folders under `root`, sorted by name.
pub fn iso_folders(root: &Path, filters: &Filters) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(root)
        .with_context(|| format!("Failed to read ISO root {}", root.display()))?;

    let mut folders: Vec<(String, PathBuf)> = entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            Some((name, entry.path()))
        })
        .filter(|(name, _)| {
            filters
                .folder_name
                .as_deref()
                .is_none_or(|wanted| wanted == name)
        })
        .collect();

    folders.sort();
    Ok(folders)
}

/// Ties the configuration, OCR backend and normalizer together.
pub struct Extractor<'a> {
    config: &'a AppConfig,
    recognizer: &'a dyn Recognizer,
    normalizer: &'a Normalizer,
}

impl<'a> Extractor<'a> {
    pub fn new(config: &'a AppConfig, recognizer: &'a dyn Recognizer, normalizer: &'a Normalizer) -> Self {
        Self {
            config,
            recognizer,
            normalizer,
        }
    }

    /// OCR text of every screenshot, in order.
    ///
    /// Screenshots that cannot be decoded are logged and skipped. A missing
    /// anchor fails the whole folder.
    pub fn read_texts(
        &self,
        bench: BenchmarkType,
        layout: &str,
        shots: &[Screenshot],
    ) -> Result<Vec<(PathBuf, String)>, ExtractError> {
        let roi = self.config.rois.for_bench(bench);
        let mut texts = Vec::with_capacity(shots.len());

        for shot in shots {
            let img = match image::open(&shot.path) {
                Ok(img) => img.to_rgba8(),
                Err(e) => {
                    log::error!("Failed to load {}: {}", shot.path.display(), e);
                    continue;
                }
            };

            let label = format!("{}_{}", bench.key(), shot.stem());
            let text = ocr::extract_image_text(&img, roi, layout, self.recognizer, &label)
                .map_err(|e| match e {
                    OcrError::AnchorNotFound => ExtractError::AnchorNotFound {
                        image: shot.path.clone(),
                    },
                })?;

            log::debug!("{} -> {:?}", shot.path.display(), text);
            texts.push((shot.path.clone(), text));
        }

        Ok(texts)
    }

    /// Reads and validates all runs of a folder.
    ///
    /// Exactly the configured number of runs must come back.
    pub fn extract_values(
        &self,
        bench: BenchmarkType,
        layout: &str,
        shots: &[Screenshot],
    ) -> Result<Vec<String>, ExtractError> {
        let texts = self.read_texts(bench, layout, shots)?;

        let expected = self.config.expected_runs(bench);
        if texts.len() != expected {
            return Err(ExtractError::WrongCount {
                bench,
                expected,
                found: texts.len(),
            });
        }

        texts
            .into_iter()
            .map(|(image, text)| {
                self.normalizer
                    .normalize(bench, &text)
                    .map_err(|_| ExtractError::Validation { bench, image, text })
            })
            .collect()
    }

    /// Runs the gate for one benchmark folder and updates the record if stale.
    ///
    /// The record is left untouched unless the whole folder succeeds.
    pub fn update_bench(
        &self,
        record: &mut IsoRecord,
        iso_path: &Path,
        bench: BenchmarkType,
    ) -> Result<UnitOutcome, ExtractError> {
        let folder = iso_path.join(bench.folder_name());
        let (decision, shots) = scan::check_folder(&folder, record.latest(bench));

        let newest = match decision {
            GateDecision::NoScreenshots => return Ok(UnitOutcome::NoScreenshots),
            GateDecision::UpToDate => return Ok(UnitOutcome::UpToDate),
            GateDecision::Stale { newest } => newest,
        };

        log::info!(
            "{} / {}: new screenshots up to {}, re-extracting {} files",
            record.name,
            bench,
            scan::format_timestamp(&newest),
            shots.len()
        );

        let values = self.extract_values(bench, &record.name, &shots)?;
        let summary = analysis::aggregate(self.normalizer, bench, &values)?;
        let latest = scan::format_timestamp(&newest);
        let values: Vec<RunValue> = values.into_iter().map(RunValue::from).collect();

        match summary {
            Summary::PassMark(scores) => {
                record.passmark.values = values;
                record.passmark.latest = latest;
                record.passmark.apply_scores(scores);
            }
            Summary::Stats(stats) => {
                if let Some(sub) = record.bench_mut(bench) {
                    sub.values = values;
                    sub.latest = latest;
                    sub.apply_stats(stats);
                }
            }
        }

        Ok(UnitOutcome::Updated)
    }

    /// Updates every matching ISO record from the screenshots under the root.
    pub fn run_update(&self, records: &mut Vec<IsoRecord>, filters: &Filters) -> Result<RunReport> {
        let mut report = RunReport::default();

        for (iso_name, iso_path) in iso_folders(&self.config.root_dir, filters)? {
            let record = store::find_or_create(records, &iso_name);
            let mut updated = false;
            let mut failed = false;

            for bench in filters.benches() {
                match self.update_bench(record, &iso_path, bench) {
                    Ok(UnitOutcome::Updated) => {
                        updated = true;
                        report.updated.push((iso_name.clone(), bench));
                    }
                    Ok(UnitOutcome::UpToDate) => report.up_to_date += 1,
                    Ok(UnitOutcome::NoScreenshots) => report.missing += 1,
                    Err(error) => {
                        failed = true;
                        log::error!("{} / {}: {}", iso_name, bench, error);
                        report.failures.push(UnitFailure {
                            iso: iso_name.clone(),
                            bench,
                            error,
                        });
                    }
                }
            }

            if updated {
                recompute_overall(record, self.normalizer);
            }
            if failed {
                record.status = STATUS_FAILED.to_string();
            } else if updated {
                record.status = STATUS_SUCCESS.to_string();
            }
        }

        Ok(report)
    }

    /// Ungated raw OCR of every matching folder, grouped by benchmark key.
    pub fn run_extract(&self, filters: &Filters) -> Result<BTreeMap<&'static str, Vec<FolderTexts>>> {
        let benches = filters.benches();
        let mut results: BTreeMap<&'static str, Vec<FolderTexts>> =
            benches.iter().map(|b| (b.key(), Vec::new())).collect();

        for (iso_name, iso_path) in iso_folders(&self.config.root_dir, filters)? {
            for &bench in &benches {
                let folder = iso_path.join(bench.folder_name());
                if !folder.is_dir() {
                    continue;
                }

                let shots = scan::list_screenshots(&folder);
                match self.read_texts(bench, &iso_name, &shots) {
                    Ok(texts) => {
                        let values: Vec<String> = texts.into_iter().map(|(_, text)| text).collect();
                        log::info!("Extracted texts for {} / {}: {}", iso_name, bench, values.join(", "));
                        results.entry(bench.key()).or_default().push(FolderTexts {
                            folder_name: iso_name.clone(),
                            values,
                        });
                    }
                    Err(e) => log::error!("{} / {}: {}", iso_name, bench, e),
                }
            }
        }

        Ok(results)
    }
}

/// Recomputes `benchmark_avg` from the populated browser benchmarks.
pub fn recompute_overall(record: &mut IsoRecord, normalizer: &Normalizer) {
    let means: Vec<f64> = BenchmarkType::ALL
        .into_iter()
        .filter_map(|bench| {
            let texts: Vec<String> = record.values(bench).iter().map(RunValue::to_text).collect();
            analysis::run_mean(normalizer, bench, &texts)
        })
        .collect();

    if let Some(avg) = analysis::overall_average(&means) {
        record.benchmark_avg = avg;
    }
}
