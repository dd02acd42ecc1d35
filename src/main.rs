//! Benchmark screenshot OCR
//!
//! Walks a tree of benchmark screenshots (one folder per tested OS image),
//! reads the scores off every new screenshot with an external OCR tool and
//! keeps a JSON results file up to date.

mod analysis;
mod bench;
mod config;
mod ocr;
mod paths;
mod pipeline;
mod scan;
mod store;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use bench::BenchmarkType;
use ocr::{CommandRecognizer, Normalizer, ScratchDir};
use pipeline::{Extractor, Filters};

#[derive(Parser, Debug)]
#[command(name = "bench-ocr", version, about = "Extract benchmark scores from screenshots")]
struct Cli {
    /// Path to config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Folder containing one sub-folder per ISO
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Results file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// OCR executable, invoked as `<ocr> -i <image>`
    #[arg(long, global = true)]
    ocr: Option<PathBuf>,

    /// Keep cropped regions in cropped_images/ next to the executable
    #[arg(long, global = true)]
    debug: bool,

    /// Only process this ISO folder
    #[arg(long, global = true)]
    folder_name: Option<String>,

    /// Only process this benchmark type
    #[arg(long = "type", value_enum, global = true)]
    bench: Option<BenchmarkType>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Re-extract stale benchmark folders and update the results file
    Update,
    /// Print the raw OCR text of every matching folder as JSON
    Extract,
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.root_dir = root;
    }
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    if let Some(ocr) = cli.ocr {
        config.ocr_executable = ocr;
    }
    config::init_config(config);
    let config = config::get_config();

    let filters = Filters {
        folder_name: cli.folder_name,
        bench: cli.bench,
    };

    let normalizer = Normalizer::new().context("Failed to compile text rules")?;
    let scratch = ScratchDir::create(cli.debug).context("Failed to create scratch directory")?;
    let recognizer = CommandRecognizer::new(&config.ocr_executable, scratch);
    log::debug!("Crops go to {}", recognizer.scratch_dir().display());

    let extractor = Extractor::new(config, &recognizer, &normalizer);

    match cli.command.unwrap_or(Command::Update) {
        Command::Update => run_update(&extractor, &filters),
        Command::Extract => run_extract(&extractor, &filters),
    }
}

fn run_update(extractor: &Extractor, filters: &Filters) -> Result<ExitCode> {
    let config = config::get_config();
    log::info!(
        "Updating {} from {}",
        config.store_path.display(),
        config.root_dir.display()
    );

    let mut results = store::load(&config.store_path);
    let report = extractor.run_update(&mut results.records, filters)?;
    store::save(&config.store_path, &results)?;

    for (iso, bench) in &report.updated {
        log::info!("Updated {} / {}", iso, bench);
    }
    for failure in &report.failures {
        eprintln!("{}", failure);
    }
    println!("{}", report.summary());

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn run_extract(extractor: &Extractor, filters: &Filters) -> Result<ExitCode> {
    let results = extractor.run_extract(filters)?;

    let json = match (&filters.folder_name, filters.bench) {
        // One folder of one benchmark: just its values
        (Some(folder_name), Some(bench)) => {
            let values: Vec<&String> = results
                .get(bench.key())
                .into_iter()
                .flatten()
                .filter(|texts| &texts.folder_name == folder_name)
                .flat_map(|texts| &texts.values)
                .collect();
            serde_json::to_string_pretty(&values)
        }
        _ => serde_json::to_string_pretty(&results),
    }
    .context("Failed to serialize extracted texts")?;

    println!("{}", json);
    Ok(ExitCode::SUCCESS)
}
