//! Backup record metadata store
//!
//! An ordered sequence of records, oldest first, persisted as pretty JSON.
//! The file is read fully, mutated in memory and rewritten fully on every
//! update; the intended deployment is a single watcher process at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::BackupError;

/// Retention cap; the oldest record (and its artifact) is evicted past this
pub const MAX_RECORDS: usize = 50;

/// Metadata describing one archive artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Monotonic identifier
    pub id: u64,
    /// Archive file name inside the backup directory
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub size_bytes: u64,
    /// Files in the source tree when the backup was taken
    pub file_count: usize,
}

/// JSON-backed record store
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records; a missing file is an empty store
    pub fn load(&self) -> Result<Vec<BackupRecord>, BackupError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn save(&self, records: &[BackupRecord]) -> Result<(), BackupError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(records)?)?;
        Ok(())
    }

    /// Next monotonic id given the current records
    pub fn next_id(records: &[BackupRecord]) -> u64 {
        records.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    /// Append a record, trimming to [`MAX_RECORDS`].
    ///
    /// Returns the evicted records, oldest first; the caller is responsible
    /// for deleting their artifacts.
    pub fn append(&self, record: BackupRecord) -> Result<Vec<BackupRecord>, BackupError> {
        let mut records = self.load()?;
        records.push(record);

        let mut evicted = Vec::new();
        while records.len() > MAX_RECORDS {
            evicted.push(records.remove(0));
        }

        self.save(&records)?;
        Ok(evicted)
    }

    pub fn find(&self, id: u64) -> Result<Option<BackupRecord>, BackupError> {
        Ok(self.load()?.into_iter().find(|r| r.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: u64) -> BackupRecord {
        BackupRecord {
            id,
            filename: format!("backup_{id}.zip"),
            created_at: Utc::now(),
            description: format!("backup {id}"),
            size_bytes: 1024,
            file_count: 3,
        }
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path().join("metadata.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_find() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path().join("metadata.json"));

        store.append(record(1)).unwrap();
        store.append(record(2)).unwrap();

        let records = store.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(store.find(2).unwrap().unwrap().filename, "backup_2.zip");
        assert!(store.find(99).unwrap().is_none());
    }

    #[test]
    fn test_next_id_is_monotonic() {
        assert_eq!(MetadataStore::next_id(&[]), 1);
        assert_eq!(MetadataStore::next_id(&[record(7), record(3)]), 8);
    }

    #[test]
    fn test_retention_evicts_oldest() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path().join("metadata.json"));

        for id in 1..=MAX_RECORDS as u64 {
            assert!(store.append(record(id)).unwrap().is_empty());
        }

        let evicted = store.append(record(MAX_RECORDS as u64 + 1)).unwrap();
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, 1);

        let records = store.load().unwrap();
        assert_eq!(records.len(), MAX_RECORDS);
        assert_eq!(records[0].id, 2);
        assert_eq!(records.last().unwrap().id, MAX_RECORDS as u64 + 1);
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path().join("metadata.json"));
        store.append(record(1)).unwrap();

        assert_eq!(store.load().unwrap(), store.load().unwrap());
    }
}
