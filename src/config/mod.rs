//! Configuration types for the extraction pipeline.
//!
//! Loads settings from config.json at startup. Provides data locations, the
//! OCR executable, expected run counts and the ROI tables.

pub mod roi;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::bench::BenchmarkType;
pub use roi::{AnchorSpec, BenchRoi, Region, RoiTable};

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Complete pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Folder containing one sub-folder per ISO
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    /// Results file maintained by the pipeline
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// OCR command-line tool, invoked as `<exe> -i <image>`
    #[serde(default = "default_ocr_executable")]
    pub ocr_executable: PathBuf,
    /// Screenshots expected per browser benchmark folder
    #[serde(default = "default_runs_per_benchmark")]
    pub runs_per_benchmark: usize,
    /// Screenshots expected in the PassMark folder
    #[serde(default = "default_passmark_runs")]
    pub passmark_runs: usize,
    #[serde(default)]
    pub rois: RoiTable,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("data_collected")
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data_benchmarks.json")
}

fn default_ocr_executable() -> PathBuf {
    PathBuf::from("Capture2Text_CLI.exe")
}

fn default_runs_per_benchmark() -> usize {
    20
}

fn default_passmark_runs() -> usize {
    1
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            store_path: default_store_path(),
            ocr_executable: default_ocr_executable(),
            runs_per_benchmark: default_runs_per_benchmark(),
            passmark_runs: default_passmark_runs(),
            rois: RoiTable::default(),
        }
    }
}

impl AppConfig {
    /// Number of validated values a benchmark folder must yield.
    pub fn expected_runs(&self, bench: BenchmarkType) -> usize {
        match bench {
            BenchmarkType::PassMark => self.passmark_runs,
            _ => self.runs_per_benchmark,
        }
    }

    /// Reads a config file, failing on IO or parse errors.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }
}

/// Loads configuration from config.json or returns defaults.
///
/// An explicit path must exist and parse. Otherwise config.json is looked up
/// next to the executable, then in the working directory; a missing or broken
/// file there falls back to the defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        log::info!("Loading config from {}", path.display());
        return AppConfig::from_file(path);
    }

    let candidates = [
        crate::paths::get_exe_dir().join("config.json"),
        PathBuf::from("config.json"),
    ];

    if let Some(config_path) = candidates.iter().find(|p| p.exists()) {
        match AppConfig::from_file(config_path) {
            Ok(config) => {
                log::info!("Config loaded from {}", config_path.display());
                return Ok(config);
            }
            Err(e) => {
                log::warn!("{:#}. Using defaults.", e);
                return Ok(AppConfig::default());
            }
        }
    }

    log::info!("config.json not found. Using default config.");
    Ok(AppConfig::default())
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config(config: AppConfig) {
    let _ = CONFIG.set(config);
}

/// Returns a reference to the global configuration, or the defaults if
/// `init_config` was never called.
pub fn get_config() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::default)
}
