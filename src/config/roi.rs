//! Region-of-interest tables.
//!
//! Each benchmark type maps a layout name (the ISO folder name) to the list of
//! screen regions holding its score. Layouts not listed use the `default`
//! entry. Coordinates are absolute pixels on the captured screenshot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::bench::BenchmarkType;

/// A screen region containing (part of) a score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Region {
    /// Axis-aligned box as `[left, top, right, bottom]`, right/bottom exclusive.
    Rect { bbox: [i32; 4] },
    /// Closed polygon; the last point connects back to the first.
    Polygon { points: Vec<[i32; 2]> },
}

impl Region {
    /// Returns the region moved by `(dx, dy)`.
    pub fn translated(&self, dx: i32, dy: i32) -> Region {
        match self {
            Region::Rect { bbox } => Region::Rect {
                bbox: [bbox[0] + dx, bbox[1] + dy, bbox[2] + dx, bbox[3] + dy],
            },
            Region::Polygon { points } => Region::Polygon {
                points: points.iter().map(|&[x, y]| [x + dx, y + dy]).collect(),
            },
        }
    }
}

/// Reference line pair used to locate layouts without a fixed origin.
///
/// The anchor is a horizontal run of `grey` pixels lying directly above a run
/// of `white` pixels, overlapping by at least `min_width` columns. `reference`
/// is where the anchor sits on the screenshot the regions were measured on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorSpec {
    pub grey: [u8; 3],
    pub white: [u8; 3],
    /// Allowed per-channel deviation
    #[serde(default = "default_tolerance")]
    pub tolerance: u8,
    #[serde(default = "default_min_width")]
    pub min_width: u32,
    pub reference: [i32; 2],
}

fn default_tolerance() -> u8 {
    8
}

fn default_min_width() -> u32 {
    597
}

/// Region configuration for one benchmark type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchRoi {
    /// Binarize rectangle crops at this luminance threshold
    #[serde(default)]
    pub threshold: Option<u8>,
    /// Offset all regions by the detected anchor position
    #[serde(default)]
    pub anchor: Option<AnchorSpec>,
    /// Layout-specific regions, keyed by ISO folder name
    #[serde(default)]
    pub layouts: HashMap<String, Vec<Region>>,
    /// Regions used when the layout is not listed
    pub default: Vec<Region>,
}

impl BenchRoi {
    /// Regions for `layout`, falling back to the default list.
    pub fn regions(&self, layout: &str) -> &[Region] {
        self.layouts
            .get(layout)
            .map(Vec::as_slice)
            .unwrap_or(&self.default)
    }
}

/// Read-only ROI configuration for all benchmark types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoiTable {
    #[serde(default = "jetstream_roi")]
    pub jetstream: BenchRoi,
    #[serde(default = "motionmark_roi")]
    pub motionmark: BenchRoi,
    #[serde(default = "speedometer_roi")]
    pub speedometer: BenchRoi,
    #[serde(default = "passmark_roi")]
    pub passmark: BenchRoi,
}

impl RoiTable {
    pub fn for_bench(&self, bench: BenchmarkType) -> &BenchRoi {
        match bench {
            BenchmarkType::JetStream => &self.jetstream,
            BenchmarkType::MotionMark => &self.motionmark,
            BenchmarkType::Speedometer => &self.speedometer,
            BenchmarkType::PassMark => &self.passmark,
        }
    }
}

impl Default for RoiTable {
    fn default() -> Self {
        Self {
            jetstream: jetstream_roi(),
            motionmark: motionmark_roi(),
            speedometer: speedometer_roi(),
            passmark: passmark_roi(),
        }
    }
}

fn rect(left: i32, top: i32, right: i32, bottom: i32) -> Region {
    Region::Rect {
        bbox: [left, top, right, bottom],
    }
}

fn polygon(points: &[[i32; 2]]) -> Region {
    Region::Polygon {
        points: points.to_vec(),
    }
}

fn layouts(entries: Vec<(&str, Vec<Region>)>) -> HashMap<String, Vec<Region>> {
    entries
        .into_iter()
        .map(|(name, regions)| (name.to_string(), regions))
        .collect()
}

fn jetstream_roi() -> BenchRoi {
    BenchRoi {
        threshold: None,
        anchor: None,
        layouts: layouts(vec![
            (
                "A01. Win10GhostSpectre SuperLite SE",
                vec![rect(869, 265, 1073, 320)],
            ),
            ("B05. TinyOS", vec![rect(869, 290, 1073, 345)]),
            ("B11. Windows 10 MNF", vec![rect(869, 290, 1073, 345)]),
        ]),
        default: vec![rect(869, 275, 1073, 330)],
    }
}

fn speedometer_roi() -> BenchRoi {
    BenchRoi {
        threshold: None,
        anchor: None,
        layouts: layouts(vec![(
            "A01. Win10GhostSpectre SuperLite SE",
            vec![rect(761, 510, 1200, 667)],
        )]),
        default: vec![rect(761, 520, 1200, 677)],
    }
}

fn motionmark_roi() -> BenchRoi {
    // Score, frame rate, then the hexagonal confidence badge
    BenchRoi {
        threshold: Some(128),
        anchor: None,
        layouts: layouts(vec![
            (
                "A01. Win10GhostSpectre SuperLite SE",
                vec![
                    rect(177, 325, 558, 431),
                    rect(150, 445, 650, 560),
                    polygon(&[[440, 546], [440, 599], [252, 599], [252, 546], [294, 546], [316, 546]]),
                ],
            ),
            (
                "B11. Windows 10 MNF",
                vec![
                    rect(177, 345, 558, 451),
                    rect(150, 465, 650, 580),
                    polygon(&[[450, 566], [450, 619], [255, 619], [255, 566], [294, 566], [316, 566]]),
                ],
            ),
            (
                "B12. Windows 10 Mordern N Fast",
                vec![
                    rect(177, 328, 558, 434),
                    rect(150, 448, 650, 563),
                    polygon(&[[445, 551], [445, 604], [260, 604], [260, 551], [294, 551], [316, 551]]),
                ],
            ),
        ]),
        default: vec![
            rect(177, 330, 558, 436),
            rect(150, 450, 650, 565),
            polygon(&[[440, 551], [440, 604], [260, 604], [260, 551], [294, 551], [316, 551]]),
        ],
    }
}

/// Placeholder geometry: not yet measured on a real PassMark screenshot.
/// Override `rois.passmark` in config.json once it is.
fn passmark_roi() -> BenchRoi {
    // Overall, CPU, 2D, 3D, memory, disk, relative to the anchor at `reference`
    BenchRoi {
        threshold: None,
        anchor: Some(AnchorSpec {
            grey: [204, 204, 204],
            white: [255, 255, 255],
            tolerance: default_tolerance(),
            min_width: default_min_width(),
            reference: [40, 210],
        }),
        layouts: HashMap::new(),
        default: vec![
            rect(470, 96, 640, 140),
            rect(520, 262, 640, 292),
            rect(520, 312, 640, 342),
            rect(520, 362, 640, 392),
            rect(520, 412, 640, 442),
            rect(520, 462, 640, 492),
        ],
    }
}
