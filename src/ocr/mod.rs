pub mod anchor;
pub mod engine;
pub mod normalize;
pub mod preprocess;

pub use anchor::find_anchor;
pub use engine::{CommandRecognizer, RecognitionError, Recognizer, ScratchDir};
pub use normalize::{MotionMarkScore, NormalizeError, Normalizer, ParsedValue};

use image::{DynamicImage, RgbaImage};
use thiserror::Error;

use crate::config::{BenchRoi, Region};
use preprocess::{binarize, crop_box, crop_polygon};

#[derive(Debug, Error, PartialEq)]
pub enum OcrError {
    #[error("anchor line pair not found")]
    AnchorNotFound,
}

/// Cuts one region out of a screenshot, ready for recognition.
///
/// Rectangles are binarized when the benchmark has a threshold. Returns
/// `None` when the region lies outside the image.
pub fn crop_region(img: &RgbaImage, region: &Region, threshold: Option<u8>) -> Option<DynamicImage> {
    match region {
        Region::Rect { bbox } => {
            let cropped = crop_box(img, *bbox)?;
            Some(match threshold {
                Some(threshold) => DynamicImage::ImageLuma8(binarize(&cropped, threshold)),
                None => DynamicImage::ImageRgba8(cropped),
            })
        }
        Region::Polygon { points } => crop_polygon(img, points).map(DynamicImage::ImageRgb8),
    }
}

/// Resolves the regions for one screenshot, applying the anchor offset.
pub fn locate_regions(img: &RgbaImage, roi: &BenchRoi, layout: &str) -> Result<Vec<Region>, OcrError> {
    let regions = roi.regions(layout);
    let Some(spec) = &roi.anchor else {
        return Ok(regions.to_vec());
    };

    let anchor = find_anchor(img, spec).ok_or(OcrError::AnchorNotFound)?;
    let (dx, dy) = anchor.offset_from(spec.reference);
    log::debug!("Anchor at ({}, {}), offset ({}, {})", anchor.x, anchor.y, dx, dy);

    Ok(regions.iter().map(|r| r.translated(dx, dy)).collect())
}

/// High-level function: screenshot → concatenated text of all its regions.
///
/// Each region is cropped and recognized in order. A crop that cannot be
/// made or recognized is logged and contributes an empty string. The first
/// region loses all interior whitespace, since score digits are often read
/// with gaps between them.
pub fn extract_image_text(
    img: &RgbaImage,
    roi: &BenchRoi,
    layout: &str,
    recognizer: &dyn Recognizer,
    label: &str,
) -> Result<String, OcrError> {
    let regions = locate_regions(img, roi, layout)?;
    let mut texts = Vec::with_capacity(regions.len());

    for (idx, region) in regions.iter().enumerate() {
        let crop_label = format!("{}_{}", label, idx + 1);

        let text = match crop_region(img, region, roi.threshold) {
            Some(crop) => match recognizer.recognize(&crop, &crop_label) {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    log::error!("OCR failed for {}: {}", crop_label, e);
                    String::new()
                }
            },
            None => {
                log::error!("Region {} of {} is outside the image", idx + 1, label);
                String::new()
            }
        };

        if idx == 0 {
            texts.push(text.split_whitespace().collect::<String>());
        } else {
            texts.push(text);
        }
    }

    Ok(texts.join(" ").trim().to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned OCR results and records what it was asked to read.
    #[derive(Default)]
    pub struct ScriptedRecognizer {
        replies: RefCell<VecDeque<Result<String, ()>>>,
        pub calls: RefCell<Vec<(String, (u32, u32))>>,
    }

    impl ScriptedRecognizer {
        pub fn new<I, S>(replies: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                replies: RefCell::new(replies.into_iter().map(|s| Ok(s.into())).collect()),
                calls: RefCell::default(),
            }
        }

        pub fn push_failure(&self) {
            self.replies.borrow_mut().push_back(Err(()));
        }

        pub fn push_reply(&self, text: &str) {
            self.replies.borrow_mut().push_back(Ok(text.to_string()));
        }
    }

    impl Recognizer for ScriptedRecognizer {
        fn recognize(&self, crop: &DynamicImage, label: &str) -> Result<String, RecognitionError> {
            self.calls
                .borrow_mut()
                .push((label.to_string(), (crop.width(), crop.height())));
            match self.replies.borrow_mut().pop_front() {
                Some(Ok(text)) => Ok(text),
                _ => Err(RecognitionError::Spawn {
                    program: "scripted".into(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no reply"),
                }),
            }
        }
    }
}
