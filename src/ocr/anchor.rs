//! Anchor detection for layouts without a fixed origin.
//!
//! The PassMark result window can sit anywhere on screen. Its header ends in a
//! grey rule drawn directly on top of a white one; finding that pair tells us
//! how far the window has moved from where the ROI table was measured.

use image::{Rgba, RgbaImage};

use crate::config::AnchorSpec;

/// Location of the anchor's grey line: first overlapping column and its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPoint {
    pub x: u32,
    pub y: u32,
}

impl AnchorPoint {
    /// Translation from the reference position to this anchor.
    pub fn offset_from(&self, reference: [i32; 2]) -> (i32, i32) {
        (self.x as i32 - reference[0], self.y as i32 - reference[1])
    }
}

fn matches(pixel: &Rgba<u8>, color: [u8; 3], tolerance: u8) -> bool {
    (0..3).all(|c| pixel[c].abs_diff(color[c]) <= tolerance)
}

/// Finds the first grey-over-white line pair at least `min_width` wide.
///
/// Rows are scanned top to bottom and columns left to right. A column counts
/// when the pixel at `y` matches grey and the one at `y + 1` matches white;
/// the first run of `min_width` consecutive such columns wins.
pub fn find_anchor(img: &RgbaImage, spec: &AnchorSpec) -> Option<AnchorPoint> {
    let (width, height) = img.dimensions();
    if spec.min_width == 0 || spec.min_width > width || height < 2 {
        return None;
    }

    for y in 0..height - 1 {
        let mut run = 0u32;
        for x in 0..width {
            let grey_above = matches(img.get_pixel(x, y), spec.grey, spec.tolerance);
            if grey_above && matches(img.get_pixel(x, y + 1), spec.white, spec.tolerance) {
                run += 1;
                if run == spec.min_width {
                    return Some(AnchorPoint {
                        x: x + 1 - spec.min_width,
                        y,
                    });
                }
            } else {
                run = 0;
            }
        }
    }

    None
}
