use regex::Regex;
use thiserror::Error;

use crate::bench::BenchmarkType;

/// Decimal point misread as `_`, `-` or `,` between two digits.
const DECIMAL_FIX: (&str, &str) = (r"(\d)[_,\-](\d)", "$1.$2");

/// A single decimal number.
const NUMBER_SHAPE: &str = r"^\d+(?:\.\d+)?$";

/// `<score> @<fps>fps <percent>%`
const MOTIONMARK_SHAPE: &str = r"^(\d+(?:\.\d+)?) @(\d+)fps (\d+(?:\.\d+)?)%$";

/// Whitespace separated alphanumeric fields.
const PASSMARK_SHAPE: &str = r"^[0-9A-Za-z.]+(?: [0-9A-Za-z.]+)*$";

/// OCR text that does not have the shape expected for its benchmark.
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("{bench} text does not match the expected format: {text:?}")]
    Mismatch { bench: BenchmarkType, text: String },
}

/// MotionMark result line split into its parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionMarkScore {
    pub score: f64,
    pub fps: u32,
    pub percent: f64,
}

/// A validated value, typed per benchmark.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    JetStream(f64),
    MotionMark(MotionMarkScore),
    Speedometer(f64),
    /// Whitespace-separated fields, not yet checked for count
    PassMark(Vec<String>),
}

struct FormatRules {
    fixups: Vec<(Regex, &'static str)>,
    shape: Regex,
}

impl FormatRules {
    fn new(fixups: &[(&str, &'static str)], shape: &str) -> Result<Self, regex::Error> {
        let fixups = fixups
            .iter()
            .map(|&(pattern, replacement)| Ok((Regex::new(pattern)?, replacement)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self {
            fixups,
            shape: Regex::new(shape)?,
        })
    }

    /// Each fix-up is repeated until it stops matching, since matches
    /// cannot overlap (`1,234,567` needs two passes).
    fn apply(&self, raw: &str) -> String {
        let mut text = raw.trim().to_string();
        for (pattern, replacement) in &self.fixups {
            loop {
                let next = pattern.replace_all(&text, *replacement);
                if next == text {
                    break;
                }
                text = next.into_owned();
            }
        }
        text.trim().to_string()
    }
}

/// Cleans up and validates OCR text, one rule set per benchmark type.
pub struct Normalizer {
    jetstream: FormatRules,
    motionmark: FormatRules,
    speedometer: FormatRules,
    passmark: FormatRules,
}

impl Normalizer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            jetstream: FormatRules::new(&[DECIMAL_FIX], NUMBER_SHAPE)?,
            motionmark: FormatRules::new(
                &[
                    // "± 1.40%" → "1.40%"
                    (r"[±+]\s*", ""),
                    // "@ 60 fps" → "@60fps"
                    (r"(?i)@\s*(\d+)\s*fps", "@${1}fps"),
                    (r"(\d)\s+%", "$1%"),
                    DECIMAL_FIX,
                    (r"\s+", " "),
                ],
                MOTIONMARK_SHAPE,
            )?,
            speedometer: FormatRules::new(&[DECIMAL_FIX], NUMBER_SHAPE)?,
            passmark: FormatRules::new(
                &[
                    // Thousands separators
                    (r"(\d),(\d{3})", "$1$2"),
                    (r"\s+", " "),
                ],
                PASSMARK_SHAPE,
            )?,
        })
    }

    fn rules(&self, bench: BenchmarkType) -> &FormatRules {
        match bench {
            BenchmarkType::JetStream => &self.jetstream,
            BenchmarkType::MotionMark => &self.motionmark,
            BenchmarkType::Speedometer => &self.speedometer,
            BenchmarkType::PassMark => &self.passmark,
        }
    }

    /// Applies the fix-ups for `bench` and validates the result.
    ///
    /// Returns the canonical text that gets stored.
    pub fn normalize(&self, bench: BenchmarkType, raw: &str) -> Result<String, NormalizeError> {
        let text = self.rules(bench).apply(raw);
        self.parse(bench, &text)?;
        Ok(text)
    }

    /// Validates already-normalized text and splits it into typed parts.
    pub fn parse(&self, bench: BenchmarkType, text: &str) -> Result<ParsedValue, NormalizeError> {
        let mismatch = || NormalizeError::Mismatch {
            bench,
            text: text.to_string(),
        };

        let caps = self.rules(bench).shape.captures(text).ok_or_else(mismatch)?;

        match bench {
            BenchmarkType::JetStream => Ok(ParsedValue::JetStream(
                text.parse().map_err(|_| mismatch())?,
            )),
            BenchmarkType::Speedometer => Ok(ParsedValue::Speedometer(
                text.parse().map_err(|_| mismatch())?,
            )),
            BenchmarkType::MotionMark => {
                let score = caps[1].parse().map_err(|_| mismatch())?;
                let fps = caps[2].parse().map_err(|_| mismatch())?;
                let percent = caps[3].parse().map_err(|_| mismatch())?;
                Ok(ParsedValue::MotionMark(MotionMarkScore {
                    score,
                    fps,
                    percent,
                }))
            }
            BenchmarkType::PassMark => Ok(ParsedValue::PassMark(
                text.split_whitespace().map(str::to_string).collect(),
            )),
        }
    }
}
