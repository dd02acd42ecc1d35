//! Screenshot discovery and the staleness gate.
//!
//! A benchmark folder holds screenshots named `YYYY-MM-DD-HH-MM-SS.png`. The
//! timestamp in the name is the only clock that matters; file modification
//! times are never consulted.

use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};

/// Filename / store timestamp format, second precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// A screenshot with a parseable timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub path: PathBuf,
    pub taken_at: NaiveDateTime,
}

impl Screenshot {
    /// Filename without extension, used to label scratch crops.
    pub fn stem(&self) -> String {
        format_timestamp(&self.taken_at)
    }
}

/// Outcome of comparing a folder against the stored `latest` timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Folder missing, unreadable or without a valid screenshot.
    NoScreenshots,
    /// Newest screenshot is not newer than what is stored.
    UpToDate,
    /// A newer screenshot exists; re-extract the whole folder.
    Stale { newest: NaiveDateTime },
}

/// Decides whether a benchmark folder needs re-extraction.
///
/// An unset stored timestamp makes any screenshot count as newer. Equal
/// timestamps are not newer.
pub fn decide(stored: Option<NaiveDateTime>, newest: Option<NaiveDateTime>) -> GateDecision {
    match (stored, newest) {
        (_, None) => GateDecision::NoScreenshots,
        (Some(stored), Some(newest)) if newest <= stored => GateDecision::UpToDate,
        (_, Some(newest)) => GateDecision::Stale { newest },
    }
}

/// Parses `YYYY-MM-DD-HH-MM-SS`; empty or malformed input gives `None`.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if text.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses the timestamp encoded in a screenshot filename.
///
/// Only `.png` files (any case) qualify.
pub fn parse_screenshot_name(file_name: &str) -> Option<NaiveDateTime> {
    let path = Path::new(file_name);
    let ext = path.extension()?.to_str()?;
    if !ext.eq_ignore_ascii_case("png") {
        return None;
    }
    parse_timestamp(path.file_stem()?.to_str()?)
}

/// Lists the valid screenshots in a folder, oldest first.
///
/// A missing or unreadable folder yields an empty list.
pub fn list_screenshots(folder: &Path) -> Vec<Screenshot> {
    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot read {}: {}", folder.display(), e);
            return Vec::new();
        }
    };

    let mut shots: Vec<Screenshot> = entries
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let name = entry.file_name();
            let taken_at = parse_screenshot_name(name.to_str()?)?;
            Some(Screenshot {
                path: entry.path(),
                taken_at,
            })
        })
        .collect();

    shots.sort_by(|a, b| a.taken_at.cmp(&b.taken_at).then_with(|| a.path.cmp(&b.path)));
    shots
}

/// Runs the gate for one folder against the stored `latest` string.
pub fn check_folder(folder: &Path, stored_latest: &str) -> (GateDecision, Vec<Screenshot>) {
    let shots = list_screenshots(folder);
    let newest = shots.last().map(|s| s.taken_at);
    (decide(parse_timestamp(stored_latest), newest), shots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ts(text: &str) -> NaiveDateTime {
        parse_timestamp(text).unwrap()
    }

    #[test]
    fn test_parse_screenshot_name() {
        assert_eq!(
            parse_screenshot_name("2025-04-16-09-33-13.png"),
            Some(ts("2025-04-16-09-33-13"))
        );
        assert!(parse_screenshot_name("2025-04-16-09-33-13.PNG").is_some());
        assert_eq!(parse_screenshot_name("notadate.png"), None);
        assert_eq!(parse_screenshot_name("2025-04-16-09-33-13.jpg"), None);
        assert_eq!(parse_screenshot_name("2025-13-16-09-33-13.png"), None);
        assert_eq!(parse_screenshot_name("2025-04-16-09-33-13"), None);
    }

    #[test]
    fn test_timestamp_round_trip() {
        let parsed = ts("2025-04-16-09-33-13");
        assert_eq!(format_timestamp(&parsed), "2025-04-16-09-33-13");
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_decide_no_screenshots() {
        assert_eq!(decide(None, None), GateDecision::NoScreenshots);
        assert_eq!(
            decide(Some(ts("2025-04-16-09-33-13")), None),
            GateDecision::NoScreenshots
        );
    }

    #[test]
    fn test_decide_equal_is_up_to_date() {
        let stored = ts("2025-04-16-09-33-13");
        assert_eq!(decide(Some(stored), Some(stored)), GateDecision::UpToDate);
    }

    #[test]
    fn test_decide_older_is_up_to_date() {
        let stored = ts("2025-04-16-09-33-13");
        let newest = ts("2025-04-16-09-33-12");
        assert_eq!(decide(Some(stored), Some(newest)), GateDecision::UpToDate);
    }

    #[test]
    fn test_decide_newer_is_stale() {
        let stored = ts("2025-04-16-09-33-13");
        let newest = ts("2025-04-16-09-33-14");
        assert_eq!(
            decide(Some(stored), Some(newest)),
            GateDecision::Stale { newest }
        );
    }

    #[test]
    fn test_decide_unset_latest_is_stale() {
        let newest = ts("2020-01-01-00-00-00");
        assert_eq!(decide(None, Some(newest)), GateDecision::Stale { newest });
    }

    #[test]
    fn test_missing_folder_is_empty() {
        let dir = tempdir().unwrap();
        let (decision, shots) = check_folder(&dir.path().join("nope"), "");
        assert_eq!(decision, GateDecision::NoScreenshots);
        assert!(shots.is_empty());
    }

    #[test]
    fn test_only_unparseable_names_is_noop() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notadate.png"), b"").unwrap();

        let (decision, _) = check_folder(dir.path(), "2025-04-16-09-33-13");
        assert_eq!(decision, GateDecision::NoScreenshots);
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        for name in [
            "2025-04-16-09-33-13.png",
            "2025-04-15-08-00-00.png",
            "notes.txt",
            "2025-04-17-10-00-00.png",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("2025-04-18-10-00-00.png")).unwrap();

        let shots = list_screenshots(dir.path());
        let stems: Vec<String> = shots.iter().map(Screenshot::stem).collect();
        assert_eq!(
            stems,
            vec![
                "2025-04-15-08-00-00",
                "2025-04-16-09-33-13",
                "2025-04-17-10-00-00"
            ]
        );

        let (decision, _) = check_folder(dir.path(), "2025-04-16-09-33-13");
        assert_eq!(
            decision,
            GateDecision::Stale {
                newest: ts("2025-04-17-10-00-00")
            }
        );
    }
}
