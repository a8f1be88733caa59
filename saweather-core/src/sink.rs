//! Per-account record of completed lookups.

use std::{
    fmt::Debug,
    fs::{self, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::SinkError, model::WeatherSnapshot};

/// Destination for snapshots worth keeping. Fire-and-forget: the caller
/// logs a failure and moves on.
pub trait SnapshotSink: Send + Sync + Debug {
    fn save(&self, snapshot: &WeatherSnapshot, owner_id: &str) -> Result<(), SinkError>;
}

/// One persisted lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: WeatherSnapshot,
}

/// Appends records as JSON lines to a local file.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records stored for `owner_id`, oldest first.
    pub fn records_for(&self, owner_id: &str) -> Result<Vec<WeatherRecord>, SinkError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path)?;
        let mut records = Vec::new();

        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WeatherRecord>(&line) {
                Ok(record) if record.owner_id == owner_id => records.push(record),
                Ok(_) => {}
                Err(e) => warn!(line = lineno + 1, error = %e, "skipping unreadable history line"),
            }
        }

        Ok(records)
    }
}

impl SnapshotSink for JsonlSink {
    fn save(&self, snapshot: &WeatherSnapshot, owner_id: &str) -> Result<(), SinkError> {
        let record = WeatherRecord {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            recorded_at: Utc::now(),
            snapshot: snapshot.clone(),
        };

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;

        debug!(id = %record.id, city = %record.snapshot.city_name, "weather record saved");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlaceQuery;

    fn snapshot(city: &str) -> WeatherSnapshot {
        WeatherSnapshot {
            city_name: city.into(),
            temperature_celsius: 18.4,
            condition_main: "Clouds".into(),
            condition_description: "overcast clouds".into(),
            humidity_percent: 60,
            wind_speed: 12.0,
            pressure: 1012.0,
            icon_id: "04d".into(),
        }
    }

    #[test]
    fn missing_file_has_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(dir.path().join("history.jsonl"));
        assert!(sink.records_for("alice").unwrap().is_empty());
    }

    #[test]
    fn records_are_filtered_by_owner_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(dir.path().join("data").join("history.jsonl"));

        sink.save(&snapshot("Tokyo"), "alice").unwrap();
        sink.save(&snapshot("Durban"), "bob").unwrap();
        sink.save(&snapshot("Paris"), "alice").unwrap();

        let alice = sink.records_for("alice").unwrap();
        let cities: Vec<_> = alice.iter().map(|r| r.snapshot.city_name.as_str()).collect();
        assert_eq!(cities, ["Tokyo", "Paris"]);
        assert_ne!(alice[0].id, alice[1].id);
        assert_eq!(alice[0].snapshot, snapshot("Tokyo"));

        assert_eq!(sink.records_for("bob").unwrap().len(), 1);
    }

    #[test]
    fn record_lines_are_flat_json() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(dir.path().join("history.jsonl"));
        sink.save(&WeatherSnapshot::default_for(&PlaceQuery::new("Soweto").unwrap()), "u1")
            .unwrap();

        let raw = fs::read_to_string(sink.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(value["owner_id"], "u1");
        assert_eq!(value["city_name"], "Soweto");
        assert_eq!(value["humidity_percent"], 45);
    }

    #[test]
    fn ids_stay_unique_across_sinks_sharing_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");

        for _ in 0..50 {
            JsonlSink::new(&path).save(&snapshot("Tokyo"), "alice").unwrap();
            JsonlSink::new(&path).save(&snapshot("Lima"), "alice").unwrap();
        }

        let records = JsonlSink::new(&path).records_for("alice").unwrap();
        let ids: std::collections::HashSet<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(records.len(), 100);
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let sink = JsonlSink::new(&path);
        sink.save(&snapshot("Tokyo"), "alice").unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not json").unwrap();
        sink.save(&snapshot("Lima"), "alice").unwrap();

        assert_eq!(sink.records_for("alice").unwrap().len(), 2);
    }
}
