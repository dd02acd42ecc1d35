//! Persistent results, one record per ISO.
//!
//! The results file is a JSON array of [`IsoRecord`]s. Loading is forgiving
//! (a missing or unreadable file is an empty set); saving always uses the
//! stable layout from [`format`].
//!
//! Every loaded entry remembers the JSON it came from. On save, only the
//! parts of a record that changed since loading are written back into that
//! JSON, so untouched records keep their keys, key order and number
//! formatting exactly.

pub mod format;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::analysis::{PassmarkScores, RunStats};
use crate::bench::BenchmarkType;

pub const STATUS_PENDING: &str = "Pending";
pub const STATUS_SUCCESS: &str = "Success";
pub const STATUS_FAILED: &str = "Failed";

/// One stored run. Older files hold bare numbers, newer ones strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunValue {
    Number(Number),
    Text(String),
}

impl RunValue {
    /// The value as the normalizer sees it.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RunValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunValue::Number(n) => write!(f, "{}", n),
            RunValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<String> for RunValue {
    fn from(text: String) -> Self {
        RunValue::Text(text)
    }
}

impl From<&str> for RunValue {
    fn from(text: &str) -> Self {
        RunValue::Text(text.to_string())
    }
}

impl PartialEq<&str> for RunValue {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, RunValue::Text(s) if s == other)
    }
}

/// Per-benchmark portion of an ISO record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchRecord {
    /// Timestamp of the newest screenshot behind `values`
    #[serde(default)]
    pub latest: String,
    #[serde(default)]
    pub values: Vec<RunValue>,
    #[serde(default)]
    pub average: String,
    #[serde(default)]
    pub highest: String,
    #[serde(default)]
    pub lowest: String,
}

impl BenchRecord {
    pub fn apply_stats(&mut self, stats: RunStats) {
        self.average = stats.average;
        self.highest = stats.highest;
        self.lowest = stats.lowest;
    }
}

/// PassMark portion of an ISO record: the raw run plus its six scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassmarkRecord {
    #[serde(default)]
    pub latest: String,
    #[serde(default)]
    pub values: Vec<RunValue>,
    #[serde(default)]
    pub overall: String,
    #[serde(default)]
    pub cpu: String,
    #[serde(default, rename = "2d")]
    pub two_d: String,
    #[serde(default, rename = "3d")]
    pub three_d: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub disk: String,
}

impl PassmarkRecord {
    pub fn apply_scores(&mut self, scores: PassmarkScores) {
        self.overall = scores.overall;
        self.cpu = scores.cpu;
        self.two_d = scores.two_d;
        self.three_d = scores.three_d;
        self.memory = scores.memory;
        self.disk = scores.disk;
    }
}

/// Results for one tested OS image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsoRecord {
    #[serde(default)]
    pub parent: Value,
    pub name: String,
    #[serde(default = "default_main")]
    pub main: Vec<String>,
    #[serde(default)]
    pub benchmark_avg: String,
    #[serde(rename = "Passmark", default, deserialize_with = "lenient")]
    pub passmark: PassmarkRecord,
    #[serde(rename = "Motionmark", default, deserialize_with = "lenient")]
    pub motionmark: BenchRecord,
    #[serde(rename = "Jetstream", default, deserialize_with = "lenient")]
    pub jetstream: BenchRecord,
    #[serde(rename = "Speedometer", default, deserialize_with = "lenient")]
    pub speedometer: BenchRecord,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_main() -> Vec<String> {
    vec![String::new(); 7]
}

fn default_status() -> String {
    STATUS_PENDING.to_string()
}

/// Accepts a malformed sub-record (e.g. a legacy `""`) as empty.
///
/// The original JSON survives in the record's origin and is written back
/// unchanged unless the sub-record is updated.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Object(_) => Ok(serde_json::from_value(value).unwrap_or_else(|e| {
            log::warn!("Treating malformed benchmark record as empty: {}", e);
            T::default()
        })),
        Value::Null => Ok(T::default()),
        Value::String(ref s) if s.is_empty() => Ok(T::default()),
        other => {
            log::warn!("Treating benchmark record {} as empty", other);
            Ok(T::default())
        }
    }
}

impl IsoRecord {
    /// A fresh record with the default shape.
    pub fn new(name: &str) -> Self {
        Self {
            parent: Value::Null,
            name: name.to_string(),
            main: default_main(),
            benchmark_avg: String::new(),
            passmark: PassmarkRecord::default(),
            motionmark: BenchRecord::default(),
            jetstream: BenchRecord::default(),
            speedometer: BenchRecord::default(),
            status: default_status(),
        }
    }

    /// The stored `latest` timestamp for a benchmark.
    pub fn latest(&self, bench: BenchmarkType) -> &str {
        match bench {
            BenchmarkType::PassMark => &self.passmark.latest,
            other => &self.bench(other).latest,
        }
    }

    /// The stored run values for a benchmark.
    pub fn values(&self, bench: BenchmarkType) -> &[RunValue] {
        match bench {
            BenchmarkType::PassMark => &self.passmark.values,
            other => &self.bench(other).values,
        }
    }

    fn bench(&self, bench: BenchmarkType) -> &BenchRecord {
        match bench {
            BenchmarkType::MotionMark => &self.motionmark,
            BenchmarkType::Speedometer => &self.speedometer,
            _ => &self.jetstream,
        }
    }

    /// Mutable sub-record for a browser benchmark; `None` for PassMark.
    pub fn bench_mut(&mut self, bench: BenchmarkType) -> Option<&mut BenchRecord> {
        match bench {
            BenchmarkType::JetStream => Some(&mut self.jetstream),
            BenchmarkType::MotionMark => Some(&mut self.motionmark),
            BenchmarkType::Speedometer => Some(&mut self.speedometer),
            BenchmarkType::PassMark => None,
        }
    }
}

/// Where a loaded record came from: its JSON on disk and the typed record as
/// first read from it.
#[derive(Debug, Clone)]
struct Origin {
    raw: Value,
    loaded: Value,
}

/// All records of a results file.
///
/// `records` may be modified and appended to, but loaded records must keep
/// their positions.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    pub records: Vec<IsoRecord>,
    origins: Vec<Origin>,
}

impl From<Vec<IsoRecord>> for ResultStore {
    fn from(records: Vec<IsoRecord>) -> Self {
        Self {
            records,
            origins: Vec::new(),
        }
    }
}

impl ResultStore {
    /// Builds a store from a parsed results document.
    ///
    /// Entries that do not read as a record are kept verbatim under an empty
    /// record, so they survive a save.
    pub fn from_json(doc: Value) -> Result<Self> {
        let Value::Array(entries) = doc else {
            anyhow::bail!("results file is not a JSON array");
        };

        let mut store = Self::default();
        for raw in entries {
            let record = match IsoRecord::deserialize(&raw) {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Keeping unreadable results entry as is: {}", e);
                    let name = raw.get("name").and_then(Value::as_str).unwrap_or_default();
                    IsoRecord::new(name)
                }
            };
            let loaded = serde_json::to_value(&record).unwrap_or(Value::Null);
            store.records.push(record);
            store.origins.push(Origin { raw, loaded });
        }
        Ok(store)
    }

    /// The results document to write.
    pub fn to_json(&self) -> Result<Value> {
        let mut entries = Vec::with_capacity(self.records.len());
        for (idx, record) in self.records.iter().enumerate() {
            let current = serde_json::to_value(record).context("Failed to serialize results")?;
            entries.push(match self.origins.get(idx) {
                Some(origin) => merge(&origin.raw, current, &origin.loaded),
                None => current,
            });
        }
        Ok(Value::Array(entries))
    }
}

/// Writes the changes between `loaded` and `current` into `raw`.
///
/// Unchanged values come from `raw` verbatim. Changed objects are merged key
/// by key: existing keys keep their position, new keys are appended only
/// when they differ from what loading produced.
fn merge(raw: &Value, current: Value, loaded: &Value) -> Value {
    if &current == loaded {
        return raw.clone();
    }

    match (raw, current) {
        (Value::Object(raw_map), Value::Object(current_map)) => {
            let mut out = raw_map.clone();
            for (key, value) in current_map {
                let before = loaded.get(&key).unwrap_or(&Value::Null);
                match raw_map.get(&key) {
                    Some(original) => {
                        let merged = merge(original, value, before);
                        out.insert(key, merged);
                    }
                    None if &value != before => {
                        out.insert(key, value);
                    }
                    None => {}
                }
            }
            Value::Object(out)
        }
        (_, current) => current,
    }
}

/// Loads all records; a missing or unreadable file gives an empty set.
pub fn load(path: &Path) -> ResultStore {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::info!("No results loaded from {}: {}", path.display(), e);
            return ResultStore::default();
        }
    };

    let parsed = serde_json::from_str(&contents)
        .map_err(anyhow::Error::from)
        .and_then(ResultStore::from_json);
    match parsed {
        Ok(store) => store,
        Err(e) => {
            log::warn!("Ignoring unreadable results file {}: {}", path.display(), e);
            ResultStore::default()
        }
    }
}

/// Renders the store in the stable layout.
pub fn to_pretty_string(store: &ResultStore) -> Result<String> {
    Ok(format::to_pretty_string(&store.to_json()?))
}

/// Writes all records, creating parent directories as needed.
///
/// The text goes to a temporary file next to `path` that then replaces it,
/// so an interrupted save leaves the previous file intact.
pub fn save(path: &Path, store: &ResultStore) -> Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
            parent
        }
        None => Path::new("."),
    };

    let text = to_pretty_string(store)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    tmp.write_all(text.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp.path().display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Finds the record named `name`, appending a new default one if absent.
pub fn find_or_create<'a>(records: &'a mut Vec<IsoRecord>, name: &str) -> &'a mut IsoRecord {
    match records.iter().position(|r| r.name == name) {
        Some(idx) => &mut records[idx],
        None => {
            records.push(IsoRecord::new(name));
            let last = records.len() - 1;
            &mut records[last]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_doc(path: &Path, doc: &Value) -> String {
        let text = format::to_pretty_string(doc);
        fs::write(path, &text).unwrap();
        text
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert!(load(&dir.path().join("data_benchmarks.json")).records.is_empty());
    }

    #[test]
    fn test_load_garbage_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data_benchmarks.json");
        fs::write(&path, "{ definitely not a list").unwrap();
        assert!(load(&path).records.is_empty());

        fs::write(&path, "{}").unwrap();
        assert!(load(&path).records.is_empty());
    }

    #[test]
    fn test_find_or_create() {
        let mut records = vec![IsoRecord::new("A01")];
        find_or_create(&mut records, "A01").status = STATUS_SUCCESS.to_string();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, STATUS_SUCCESS);

        let created = find_or_create(&mut records, "B05");
        assert_eq!(created.name, "B05");
        assert_eq!(created.status, STATUS_PENDING);
        assert_eq!(created.main, vec![""; 7]);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data_benchmarks.json");

        let mut record = IsoRecord::new("A01. Win10GhostSpectre SuperLite SE");
        record.jetstream.latest = "2025-04-16-09-33-13".into();
        record.jetstream.values = (0..20).map(|i| RunValue::from(format!("{}.5", 300 + i))).collect();
        record.jetstream.average = "309.500".into();
        record.passmark.two_d = "1020.5".into();
        let records = vec![record, IsoRecord::new("B05. TinyOS")];

        save(&path, &ResultStore::from(records.clone())).unwrap();
        assert_eq!(load(&path).records, records);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"2d\": \"1020.5\""));
        assert!(text.contains(
            "      \"300.5\", \"301.5\", \"302.5\", \"303.5\", \"304.5\", \"305.5\", \"306.5\",\n"
        ));
    }

    #[test]
    fn test_resave_is_byte_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data_benchmarks.json");
        save(&path, &ResultStore::from(vec![IsoRecord::new("A01")])).unwrap();
        let first = fs::read_to_string(&path).unwrap();

        save(&path, &load(&path)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_save_replaces_file_without_leftovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data_benchmarks.json");
        fs::write(&path, "[]").unwrap();

        save(&path, &ResultStore::from(vec![IsoRecord::new("A01")])).unwrap();

        assert_eq!(load(&path).records, vec![IsoRecord::new("A01")]);
        let names: Vec<_> = fs::read_dir(dir.path()).unwrap().flatten().map(|e| e.file_name()).collect();
        assert_eq!(names, vec![std::ffi::OsString::from("data_benchmarks.json")]);
    }

    #[test]
    fn test_numeric_values_survive_resave() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data_benchmarks.json");
        let original = write_doc(
            &path,
            &json!([{
                "name": "A01",
                "Jetstream": {
                    "latest": "2025-04-16-09-33-13",
                    "values": [100.1, 100.2, 100.0, 99]
                }
            }]),
        );

        let store = load(&path);
        let jetstream = &store.records[0].jetstream;
        assert_eq!(jetstream.latest, "2025-04-16-09-33-13");
        let texts: Vec<String> = jetstream.values.iter().map(RunValue::to_text).collect();
        assert_eq!(texts, vec!["100.1", "100.2", "100.0", "99"]);

        save(&path, &store).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_legacy_layout_resave_is_byte_identical() {
        // Older files: lowercase placeholder key in the middle, no status,
        // sub-records without stats, extra keys
        let dir = tempdir().unwrap();
        let path = dir.path().join("data_benchmarks.json");
        let original = write_doc(
            &path,
            &json!([
                {
                    "parent": 3,
                    "name": "A01",
                    "main": ["x", "", "", "", "", "", ""],
                    "benchmark_avg": "12.00",
                    "passmark": "",
                    "Motionmark": { "latest": "", "values": [] },
                    "Jetstream": { "note": "manual", "latest": "2025-04-16-09-33-13", "values": ["1.0"] },
                    "Speedometer": ""
                },
                { "title": "not a record" }
            ]),
        );

        let store = load(&path);
        assert_eq!(store.records.len(), 2);
        let record = &store.records[0];
        assert_eq!(record.parent, Value::from(3));
        assert_eq!(record.latest(BenchmarkType::JetStream), "2025-04-16-09-33-13");
        assert_eq!(record.speedometer, BenchRecord::default());
        assert_eq!(record.status, STATUS_PENDING);

        save(&path, &store).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_update_merges_into_original_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data_benchmarks.json");
        write_doc(
            &path,
            &json!([
                { "name": "A01", "passmark": "", "Jetstream": { "note": "manual", "latest": "", "values": [] } },
                { "name": "B05", "passmark": "" }
            ]),
        );

        let mut store = load(&path);
        let record = find_or_create(&mut store.records, "A01");
        record.jetstream.latest = "2025-04-16-09-33-13".into();
        record.jetstream.values = vec!["1.5".into()];
        record.jetstream.average = "1.500".into();
        find_or_create(&mut store.records, "C01");

        let doc = store.to_json().unwrap();
        let a01: Vec<&String> = doc[0].as_object().unwrap().keys().collect();
        assert_eq!(a01, vec!["name", "passmark", "Jetstream"]);
        let jetstream: Vec<&String> = doc[0]["Jetstream"].as_object().unwrap().keys().collect();
        assert_eq!(jetstream, vec!["note", "latest", "values", "average"]);
        assert_eq!(doc[0]["Jetstream"]["values"], json!(["1.5"]));

        // Untouched record stays as loaded, new record gets the full shape
        assert_eq!(doc[1], json!({ "name": "B05", "passmark": "" }));
        assert_eq!(doc[2], serde_json::to_value(IsoRecord::new("C01")).unwrap());
    }

    #[test]
    fn test_wrong_typed_sub_record_is_reset() {
        let json = r#"[{ "name": "A01", "Passmark": "", "Jetstream": 5 }]"#;
        let records: Vec<IsoRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].passmark, PassmarkRecord::default());
        assert_eq!(records[0].jetstream, BenchRecord::default());
        assert_eq!(records[0].status, STATUS_PENDING);
    }

    #[test]
    fn test_run_value_text() {
        let values: Vec<RunValue> = serde_json::from_str(r#"[100.25, 7, "532.11 @60fps 1.00%"]"#).unwrap();
        assert_eq!(values[0].to_text(), "100.25");
        assert_eq!(values[1].to_text(), "7");
        assert_eq!(values[2], "532.11 @60fps 1.00%");
        assert_eq!(serde_json::to_string(&values).unwrap(), r#"[100.25,7,"532.11 @60fps 1.00%"]"#);
    }
}
