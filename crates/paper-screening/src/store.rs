//! Persisted collections: bounded result history and rolling status log.
//!
//! Both collections sit on a [`KeyValueStore`]. Each read-modify-write runs
//! under one mutex with no suspension point inside, so no caller ever sees
//! a collection longer than its cap.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult};
use crate::models::AnalysisResult;

/// Collection holding analysis history.
pub const HISTORY_COLLECTION: &str = "analysisResults";

/// Collection holding the status log.
pub const STATUS_COLLECTION: &str = "statusLog";

/// Durable key to JSON document storage.
pub trait KeyValueStore: Send + Sync {
    /// Stored document, or `None` if the collection was never written.
    fn load(&self, collection: &str) -> PipelineResult<Option<Value>>;

    /// Replace the stored document.
    fn save(&self, collection: &str, value: &Value) -> PipelineResult<()>;
}

/// One JSON file per collection under a directory.
///
/// Writes go to a temporary sibling first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Store rooted at `dir` (created on first write).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn load(&self, collection: &str) -> PipelineResult<Option<Value>> {
        let path = self.path(collection);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PipelineError::storage(format!(
                    "read {}: {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| PipelineError::storage(format!("decode {}: {e}", path.display())))
    }

    fn save(&self, collection: &str, value: &Value) -> PipelineResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path(collection);
        let tmp = self.dir.join(format!(".{collection}.{}.tmp", Uuid::new_v4().simple()));

        let body = serde_json::to_vec_pretty(value)
            .map_err(|e| PipelineError::storage(format!("encode {collection}: {e}")))?;
        std::fs::write(&tmp, body)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(PipelineError::storage(format!(
                "replace {}: {e}",
                path.display()
            )));
        }
        Ok(())
    }
}

/// Process-local store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, collection: &str) -> PipelineResult<Option<Value>> {
        Ok(lock(&self.collections).get(collection).cloned())
    }

    fn save(&self, collection: &str, value: &Value) -> PipelineResult<()> {
        lock(&self.collections).insert(collection.to_string(), value.clone());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn load_list<T: DeserializeOwned>(
    backend: &dyn KeyValueStore,
    collection: &str,
) -> PipelineResult<Vec<T>> {
    match backend.load(collection)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| PipelineError::storage(format!("decode {collection}: {e}"))),
    }
}

fn save_list<T: Serialize>(
    backend: &dyn KeyValueStore,
    collection: &str,
    items: &[T],
) -> PipelineResult<()> {
    let value = serde_json::to_value(items)
        .map_err(|e| PipelineError::storage(format!("encode {collection}: {e}")))?;
    backend.save(collection, &value)
}

/// Append-only analysis history capped at `max_results` entries.
pub struct ResultStore {
    backend: Arc<dyn KeyValueStore>,
    max_results: usize,
    guard: Mutex<()>,
}

impl ResultStore {
    /// History over `backend`, keeping the newest `max_results` entries.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>, max_results: usize) -> Self {
        Self {
            backend,
            max_results,
            guard: Mutex::new(()),
        }
    }

    /// Append results, dropping the oldest beyond the cap.
    ///
    /// Returns the stored length.
    pub fn append(&self, results: Vec<AnalysisResult>) -> PipelineResult<usize> {
        let _held = lock(&self.guard);
        let mut stored: Vec<AnalysisResult> =
            load_list(self.backend.as_ref(), HISTORY_COLLECTION)?;
        stored.extend(results);
        if stored.len() > self.max_results {
            let excess = stored.len() - self.max_results;
            stored.drain(..excess);
        }
        save_list(self.backend.as_ref(), HISTORY_COLLECTION, &stored)?;
        Ok(stored.len())
    }

    /// Stored results, oldest first.
    pub fn list(&self) -> PipelineResult<Vec<AnalysisResult>> {
        let _held = lock(&self.guard);
        load_list(self.backend.as_ref(), HISTORY_COLLECTION)
    }

    /// Remove one result by id. Returns whether it existed.
    pub fn delete(&self, id: Uuid) -> PipelineResult<bool> {
        let _held = lock(&self.guard);
        let mut stored: Vec<AnalysisResult> =
            load_list(self.backend.as_ref(), HISTORY_COLLECTION)?;
        let before = stored.len();
        stored.retain(|r| r.id != id);
        if stored.len() == before {
            return Ok(false);
        }
        save_list(self.backend.as_ref(), HISTORY_COLLECTION, &stored)?;
        Ok(true)
    }

    /// Cap on stored entries.
    #[must_use]
    pub const fn max_results(&self) -> usize {
        self.max_results
    }
}

impl fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultStore")
            .field("max_results", &self.max_results)
            .finish()
    }
}

/// Severity of a status entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    /// Progress.
    Info,
    /// Degraded but continuing.
    Warn,
    /// Operation failed.
    Error,
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// One status log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: StatusLevel,
    /// Text.
    pub message: String,
}

/// Most-recent-first activity log.
pub struct StatusLog {
    backend: Arc<dyn KeyValueStore>,
    max_entries: usize,
    guard: Mutex<()>,
}

impl StatusLog {
    /// Log over `backend` keeping `max_entries` lines.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>, max_entries: usize) -> Self {
        Self {
            backend,
            max_entries,
            guard: Mutex::new(()),
        }
    }

    /// Prepend an entry.
    pub fn record(&self, level: StatusLevel, message: impl Into<String>) -> PipelineResult<()> {
        let entry = StatusEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        };
        let _held = lock(&self.guard);
        let mut entries: Vec<StatusEntry> =
            load_list(self.backend.as_ref(), STATUS_COLLECTION)?;
        entries.insert(0, entry);
        entries.truncate(self.max_entries);
        save_list(self.backend.as_ref(), STATUS_COLLECTION, &entries)
    }

    /// Entries, newest first.
    pub fn entries(&self) -> PipelineResult<Vec<StatusEntry>> {
        let _held = lock(&self.guard);
        load_list(self.backend.as_ref(), STATUS_COLLECTION)
    }
}

impl fmt::Debug for StatusLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusLog")
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisOrigin, AnalysisPayload, RawRecord, Score, SourceId};

    fn result(title: &str) -> AnalysisResult {
        let paper = RawRecord {
            title: Some(title.to_string()),
            ..RawRecord::new(SourceId::Arxiv)
        }
        .into_record()
        .unwrap();
        let payload = AnalysisPayload {
            summary: title.to_string(),
            key_points: vec![],
            innovation_score: Score::NEUTRAL,
            practical_score: Score::NEUTRAL,
            impact_score: Score::NEUTRAL,
            related_work: String::new(),
            methodology: String::new(),
            limitations: String::new(),
            confidence: 0.2,
            origin: AnalysisOrigin::RuleBased,
            extended: None,
        };
        AnalysisResult::new(paper, payload, None)
    }

    #[test]
    fn test_append_keeps_newest_in_order() {
        let store = ResultStore::new(Arc::new(MemoryStore::new()), 3);
        assert_eq!(store.append(vec![result("a"), result("b")]).unwrap(), 2);
        assert_eq!(store.append(vec![result("c"), result("d")]).unwrap(), 3);
        let titles: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.paper.title)
            .collect();
        assert_eq!(titles, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_delete_by_id() {
        let store = ResultStore::new(Arc::new(MemoryStore::new()), 10);
        let keep = result("keep");
        let gone = result("gone");
        let gone_id = gone.id;
        store.append(vec![keep, gone]).unwrap();
        assert!(store.delete(gone_id).unwrap());
        assert!(!store.delete(gone_id).unwrap());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_status_log_most_recent_first_and_capped() {
        let log = StatusLog::new(Arc::new(MemoryStore::new()), 2);
        log.record(StatusLevel::Info, "one").unwrap();
        log.record(StatusLevel::Warn, "two").unwrap();
        log.record(StatusLevel::Error, "three").unwrap();
        let messages: Vec<_> = log
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["three", "two"]);
    }

    #[test]
    fn test_corrupt_collection_is_storage_failure() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .save(HISTORY_COLLECTION, &serde_json::json!({"not": "a list"}))
            .unwrap();
        let store = ResultStore::new(backend, 10);
        let err = store.list().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::StorageFailure);
    }
}
