//! Append-only question/answer log persisted as one JSON array.
//!
//! Every [`HistoryStore::append`] is a full read-modify-write of
//! `history.json`: read the array (a missing or unparseable file counts as
//! empty), push the new record, rewrite the file. That makes each append
//! O(log size) and **not** safe to run from two places at once; the
//! orchestrator's single in-flight request is what serialises writers.
//!
//! Reading never fails. A damaged file shows up as an empty history rather
//! than an error dialog.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timestamp layout: ISO-8601 local time, second precision.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ---------------------------------------------------------------------------
// InteractionRecord
// ---------------------------------------------------------------------------

/// One completed exchange. Never modified after it is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Local time the answer was stored, e.g. `2024-05-01T09:30:12`.
    pub time: String,
    pub question: String,
    pub answer: String,
}

impl InteractionRecord {
    /// Build a record stamped with the current local time.
    pub fn now(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            time: Local::now().format(TIME_FORMAT).to_string(),
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Short one-line label for list views: `[time] first 20 chars...`.
    pub fn summary(&self) -> String {
        let head: String = self.question.chars().take(20).collect();
        format!("[{}] {}...", self.time, head)
    }
}

// ---------------------------------------------------------------------------
// HistoryError
// ---------------------------------------------------------------------------

/// Failure to write the log. Reads never produce one.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("cannot write history to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialise history: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

/// Owner of `history.json`.
///
/// ```rust,no_run
/// use desk_chat::history::HistoryStore;
///
/// let store = HistoryStore::new("history.json");
/// store.append("hello", "hi there").unwrap();
/// assert_eq!(store.load_all().last().unwrap().answer, "hi there");
/// ```
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in insertion order. Missing or corrupt file → empty.
    pub fn load_all(&self) -> Vec<InteractionRecord> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&data) {
            Ok(records) => records,
            Err(e) => {
                log::warn!(
                    "history file {} is unreadable ({e}); treating as empty",
                    self.path.display()
                );
                Vec::new()
            }
        }
    }

    /// Stamp `(question, answer)` with the current time and append it.
    pub fn append(&self, question: &str, answer: &str) -> Result<InteractionRecord, HistoryError> {
        let record = InteractionRecord::now(question, answer);
        self.push(record.clone())?;
        Ok(record)
    }

    /// Append an already-built record.
    pub fn push(&self, record: InteractionRecord) -> Result<(), HistoryError> {
        let mut records = self.load_all();
        records.push(record);

        let json = serde_json::to_string_pretty(&records)?;
        let write_err = |source| HistoryError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(&self.path, json).map_err(write_err)?;
        log::debug!("history: {} records in {}", records.len(), self.path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> HistoryStore {
        HistoryStore::new(dir.join("history.json"))
    }

    #[test]
    fn appends_read_back_in_call_order() {
        let dir = tempdir().expect("temp dir");
        let store = store_in(dir.path());

        let pairs = [("one", "1"), ("two", "2"), ("three", "3"), ("two", "again")];
        for (q, a) in pairs {
            store.append(q, a).expect("append");
        }

        let loaded: Vec<(String, String)> = store
            .load_all()
            .into_iter()
            .map(|r| (r.question, r.answer))
            .collect();
        let expected: Vec<(String, String)> = pairs
            .iter()
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect();
        assert_eq!(loaded, expected);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().expect("temp dir");
        assert!(store_in(dir.path()).load_all().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempdir().expect("temp dir");
        let store = store_in(dir.path());
        std::fs::write(store.path(), "[{\"time\": \"2024").expect("write");
        assert!(store.load_all().is_empty());
    }

    #[test]
    fn wrong_shape_loads_empty() {
        let dir = tempdir().expect("temp dir");
        let store = store_in(dir.path());
        std::fs::write(store.path(), r#"{"question": "not a list"}"#).expect("write");
        assert!(store.load_all().is_empty());
    }

    #[test]
    fn append_over_corrupt_file_starts_fresh() {
        let dir = tempdir().expect("temp dir");
        let store = store_in(dir.path());
        std::fs::write(store.path(), "garbage").expect("write");

        store.append("hello", "hi there").expect("append");

        let records = store.load_all();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].question, "hello");
    }

    #[test]
    fn file_uses_original_field_names() {
        let dir = tempdir().expect("temp dir");
        let store = store_in(dir.path());
        store.append("你好", "您好").expect("append");

        let raw = std::fs::read_to_string(store.path()).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        let first = &value[0];
        assert!(first["time"].is_string());
        assert_eq!(first["question"], "你好");
        assert_eq!(first["answer"], "您好");
        // Non-ASCII text is stored as-is, not \u-escaped.
        assert!(raw.contains("你好"));
    }

    #[test]
    fn timestamp_has_second_precision() {
        let record = InteractionRecord::now("q", "a");
        assert!(chrono::NaiveDateTime::parse_from_str(&record.time, TIME_FORMAT).is_ok());
        assert_eq!(record.time.len(), "2024-05-01T09:30:12".len());
    }

    #[test]
    fn summary_truncates_question() {
        let record = InteractionRecord {
            time: "2024-05-01T09:30:12".into(),
            question: "abcdefghijklmnopqrstuvwxyz".into(),
            answer: String::new(),
        };
        assert_eq!(record.summary(), "[2024-05-01T09:30:12] abcdefghijklmnopqrst...");
    }

    #[test]
    fn append_to_unwritable_location_reports_error() {
        let dir = tempdir().expect("temp dir");
        // A directory where the file should be makes the write fail.
        let path = dir.path().join("history.json");
        std::fs::create_dir(&path).expect("mkdir");

        let store = HistoryStore::new(&path);
        let err = store.append("q", "a").unwrap_err();
        assert!(matches!(err, HistoryError::Write { .. }));
    }
}
