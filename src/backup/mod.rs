//! Backup action
//!
//! Archives the configured source set into a timestamped zip in the backup
//! directory and appends a record to the JSON metadata store, keeping at most
//! [`metadata::MAX_RECORDS`] records (oldest artifact deleted on eviction).

pub mod archive;
pub mod metadata;

use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::events::{Event, EventBus};
use crate::shared::walk::count_files;
use crate::shared::copy_tree;
use self::archive::ArchiveSources;
use self::metadata::{BackupRecord, MetadataStore};

const METADATA_FILE: &str = "backup-metadata.json";
const ACTION_LOG: &str = "auto-backup.log";

/// Backup operation errors
#[derive(Error, Debug)]
pub enum BackupError {
    /// No record with the given id
    #[error("unknown backup id: {0}")]
    UnknownId(u64),

    /// The record exists but its zip is gone
    #[error("backup artifact missing: {0}")]
    MissingArtifact(PathBuf),

    /// Archive error
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata (de)serialization error
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Paths and source set for the backup action
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Project root the source set is resolved against
    pub source_root: PathBuf,
    /// Where archives, metadata and the action log live
    pub backup_dir: PathBuf,
    /// Source tree name under the project root (archived under its own prefix)
    pub src_dir: String,
    /// Docs tree name under the project root
    pub docs_dir: String,
    /// Named files at the project root included in every archive
    pub root_files: Vec<String>,
}

impl BackupConfig {
    /// The watched/archived source tree
    pub fn src_path(&self) -> PathBuf {
        self.source_root.join(&self.src_dir)
    }

    fn archive_sources(&self) -> ArchiveSources {
        ArchiveSources {
            dirs: vec![
                (self.src_path(), self.src_dir.clone()),
                (self.source_root.join(&self.docs_dir), self.docs_dir.clone()),
            ],
            files: self
                .root_files
                .iter()
                .map(|name| self.source_root.join(name))
                .collect(),
        }
    }
}

/// Creates, lists and restores backups
pub struct BackupManager {
    config: BackupConfig,
    store: MetadataStore,
    events: Arc<EventBus>,
}

impl BackupManager {
    pub fn new(config: BackupConfig, events: Arc<EventBus>) -> Self {
        let store = MetadataStore::new(config.backup_dir.join(METADATA_FILE));
        Self {
            config,
            store,
            events,
        }
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    fn archive_name(created_at: DateTime<Utc>) -> String {
        // Microsecond precision: back-to-back backups must not collide
        let stamp = created_at
            .to_rfc3339_opts(SecondsFormat::Micros, true)
            .replace([':', '.'], "-");
        format!("backup_{stamp}.zip")
    }

    /// Archive the source set and append a record
    pub fn create(&self, description: &str) -> Result<BackupRecord, BackupError> {
        fs::create_dir_all(&self.config.backup_dir)?;

        let created_at = Utc::now();
        let filename = Self::archive_name(created_at);
        let dest = self.config.backup_dir.join(&filename);

        let size_bytes = archive::write_archive(&dest, &self.config.archive_sources())?;
        let file_count = count_files(self.config.src_path());

        let records = self.store.load()?;
        let record = BackupRecord {
            id: MetadataStore::next_id(&records),
            filename: filename.clone(),
            created_at,
            description: if description.is_empty() {
                "manual backup".to_string()
            } else {
                description.to_string()
            },
            size_bytes,
            file_count,
        };

        let evicted = self.store.append(record.clone())?;
        for old in evicted {
            let artifact = self.config.backup_dir.join(&old.filename);
            match fs::remove_file(&artifact) {
                Ok(()) => info!("evicted old backup {}", old.filename),
                // A record whose artifact already vanished is still evicted
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!("could not delete {}: {}", artifact.display(), err),
            }
            self.events.emit(Event::BackupEvicted {
                id: old.id,
                filename: old.filename,
            });
        }

        info!(
            "created backup {} ({} bytes, {} files): {}",
            record.filename, record.size_bytes, record.file_count, record.description
        );
        self.events.emit(Event::BackupCreated {
            id: record.id,
            filename: record.filename.clone(),
            size_bytes: record.size_bytes,
            description: record.description.clone(),
        });
        self.append_action_log(&record.description);

        Ok(record)
    }

    /// All records, oldest first
    pub fn list(&self) -> Result<Vec<BackupRecord>, BackupError> {
        self.store.load()
    }

    pub fn find(&self, id: u64) -> Result<Option<BackupRecord>, BackupError> {
        self.store.find(id)
    }

    /// Restore the source set from a backup.
    ///
    /// Order matters: the archive is verified and extracted into a staging
    /// directory, and a fresh safety backup is taken, before anything in the
    /// live tree is touched. A bad archive fails the restore with the live
    /// tree intact.
    pub fn restore(&self, id: u64) -> Result<BackupRecord, BackupError> {
        let record = self.store.find(id)?.ok_or(BackupError::UnknownId(id))?;
        let archive_path = self.config.backup_dir.join(&record.filename);
        if !archive_path.is_file() {
            return Err(BackupError::MissingArtifact(archive_path));
        }

        archive::verify_archive(&archive_path)?;

        let staging = self.config.backup_dir.join(format!(".restore-{id}"));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;
        let staged = archive::extract_archive(&archive_path, &staging)
            .and_then(|_| self.create(&format!("pre-restore safety backup (restoring #{id})")));

        let result = staged.and_then(|_| self.swap_in(&staging));
        // Staging leftovers are harmless either way
        let _ = fs::remove_dir_all(&staging);
        result?;

        info!("restored backup #{}: {}", record.id, record.description);
        Ok(record)
    }

    /// Replace the live source set with the staged extraction
    fn swap_in(&self, staging: &Path) -> Result<(), BackupError> {
        let staged_src = staging.join(&self.config.src_dir);
        if staged_src.is_dir() {
            let live_src = self.config.src_path();
            if live_src.exists() {
                fs::remove_dir_all(&live_src)?;
            }
            copy_tree(&staged_src, &live_src)?;
        }

        let staged_docs = staging.join(&self.config.docs_dir);
        if staged_docs.is_dir() {
            copy_tree(&staged_docs, &self.config.source_root.join(&self.config.docs_dir))?;
        }

        for name in &self.config.root_files {
            let staged_file = staging.join(name);
            if staged_file.is_file() {
                fs::copy(&staged_file, self.config.source_root.join(name))?;
            }
        }
        Ok(())
    }

    /// Append-only log line for unattended runs; best effort
    fn append_action_log(&self, line: &str) {
        let path = self.config.backup_dir.join(ACTION_LOG);
        let entry = format!("[{}] {}\n", Utc::now().to_rfc3339(), line);
        let written = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(entry.as_bytes()));
        if let Err(err) = written {
            warn!("could not append to {}: {}", path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_name_is_filesystem_safe() {
        let stamp = "2025-03-01T10:20:30.456Z".parse::<DateTime<Utc>>().unwrap();
        let name = BackupManager::archive_name(stamp);
        assert_eq!(name, "backup_2025-03-01T10-20-30-456000Z.zip");
        assert!(!name.contains(':'));
        assert!(!name.trim_end_matches(".zip").contains('.'));
    }
}
