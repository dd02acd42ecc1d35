//! Benchmark types known to the pipeline.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One benchmark suite whose screenshots are collected per ISO.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkType {
    #[value(name = "jetstream")]
    JetStream,
    #[value(name = "motionmark")]
    MotionMark,
    Speedometer,
    #[value(name = "passmark")]
    PassMark,
}

impl BenchmarkType {
    /// All types, in processing order.
    pub const ALL: [BenchmarkType; 4] = [
        BenchmarkType::JetStream,
        BenchmarkType::MotionMark,
        BenchmarkType::Speedometer,
        BenchmarkType::PassMark,
    ];

    /// Name of the screenshot sub-folder inside an ISO folder.
    pub fn folder_name(self) -> &'static str {
        match self {
            BenchmarkType::JetStream => "Screenshots_JetStream",
            BenchmarkType::MotionMark => "Screenshots_MotionMark",
            BenchmarkType::Speedometer => "Screenshots_SpeedoMeter",
            BenchmarkType::PassMark => "Screenshots_Passmark",
        }
    }

    /// Lowercase key used on the command line and in `extract` output.
    pub fn key(self) -> &'static str {
        match self {
            BenchmarkType::JetStream => "jetstream",
            BenchmarkType::MotionMark => "motionmark",
            BenchmarkType::Speedometer => "speedometer",
            BenchmarkType::PassMark => "passmark",
        }
    }

    /// Whether the overall `benchmark_avg` includes this type.
    pub fn counts_toward_overall(self) -> bool {
        !matches!(self, BenchmarkType::PassMark)
    }
}

impl fmt::Display for BenchmarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
