//! Sync action
//!
//! Mirrors the configured directories and files from the project root into a
//! separate git working copy, then runs an add/commit/push sequence there.
//! A clean tree after the mirror is a deliberate no-op: no empty commits.

pub mod git;

use chrono::Local;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::events::{Event, EventBus};
use crate::shared::copy_tree;
use self::git::GitRunner;

const ACTION_LOG: &str = "git-sync.log";

/// Sync operation errors
#[derive(Error, Debug)]
pub enum SyncError {
    /// The configured working copy is not a directory
    #[error("working copy does not exist: {0}")]
    MissingWorkTree(PathBuf),

    /// git itself could not be started
    #[error("failed to run git: {0}")]
    GitSpawn(#[source] std::io::Error),

    /// A git command exited non-zero
    #[error("git {command} failed (exit {code}): {stderr}")]
    GitCommand {
        command: String,
        code: i32,
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Whether a later tick could succeed without operator intervention
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SyncError::MissingWorkTree(_))
    }
}

/// Source set and git target for the sync action
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Project root the mirrored set is resolved against
    pub source_root: PathBuf,
    /// The git working copy the set is mirrored into
    pub work_tree: PathBuf,
    /// Directory names mirrored recursively
    pub dirs: Vec<String>,
    /// File names mirrored individually
    pub files: Vec<String>,
    pub remote: String,
    pub branch: String,
    /// Where the append-only sync log lives (the backup directory)
    pub log_dir: PathBuf,
}

/// Result of one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Changes were committed and pushed (carries the stamped message)
    Pushed { message: String },
    /// The working copy was clean after the mirror; nothing to commit
    NoChanges,
}

/// Mirrors the project into the working copy and pushes
pub struct SyncManager {
    config: SyncConfig,
    git: GitRunner,
    events: Arc<EventBus>,
}

impl SyncManager {
    pub fn new(config: SyncConfig, events: Arc<EventBus>) -> Self {
        let git = GitRunner::new(&config.work_tree);
        Self {
            config,
            git,
            events,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Copy the configured directories and files into the working copy.
    ///
    /// Each entry is best effort: a failed copy is reported and skipped, it
    /// does not roll back files already copied.
    pub fn mirror(&self) -> Result<(), SyncError> {
        if !self.config.work_tree.is_dir() {
            return Err(SyncError::MissingWorkTree(self.config.work_tree.clone()));
        }

        for dir in &self.config.dirs {
            let src = self.config.source_root.join(dir);
            if !src.is_dir() {
                continue;
            }
            match copy_tree(&src, &self.config.work_tree.join(dir)) {
                Ok(copied) => info!("mirrored {} ({} files)", dir, copied),
                Err(err) => warn!("mirror of {} incomplete: {}", dir, err),
            }
        }

        for file in &self.config.files {
            let src = self.config.source_root.join(file);
            if !src.is_file() {
                continue;
            }
            if let Err(err) = fs::copy(&src, self.config.work_tree.join(file)) {
                warn!("could not mirror {}: {}", file, err);
            }
        }
        Ok(())
    }

    /// Mirror, then commit and push unless the tree is clean
    pub fn sync(&self, message: &str) -> Result<SyncOutcome, SyncError> {
        self.mirror()?;

        let status = self.git.status_porcelain()?;
        if status.trim().is_empty() {
            info!("working copy clean, skipping commit");
            self.events.emit(Event::SyncSkipped);
            return Ok(SyncOutcome::NoChanges);
        }

        let stamped = format!("{} - {}", message, Local::now().format("%Y-%m-%d %H:%M:%S"));
        self.git.add_all()?;
        self.git.commit(&stamped)?;
        self.git.push(&self.config.remote, &self.config.branch)?;

        info!(
            "pushed to {}/{}: {}",
            self.config.remote, self.config.branch, stamped
        );
        self.events.emit(Event::SyncPushed {
            message: stamped.clone(),
        });
        self.append_action_log(message);

        Ok(SyncOutcome::Pushed { message: stamped })
    }

    /// Append-only log line for unattended runs; best effort
    fn append_action_log(&self, line: &str) {
        let path = self.config.log_dir.join(ACTION_LOG);
        let entry = format!("[{}] {}\n", chrono::Utc::now().to_rfc3339(), line);
        let written = fs::create_dir_all(&self.config.log_dir).and_then(|_| {
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .and_then(|mut file| file.write_all(entry.as_bytes()))
        });
        if let Err(err) = written {
            warn!("could not append to {}: {}", path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(source: &TempDir, work: &TempDir) -> SyncConfig {
        SyncConfig {
            source_root: source.path().to_path_buf(),
            work_tree: work.path().to_path_buf(),
            dirs: vec!["src".to_string(), "docs".to_string()],
            files: vec!["README.md".to_string(), "package.json".to_string()],
            remote: "origin".to_string(),
            branch: "master".to_string(),
            log_dir: source.path().join("backups"),
        }
    }

    #[test]
    fn test_mirror_copies_configured_set() {
        let source = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();

        fs::create_dir_all(source.path().join("src/pages")).unwrap();
        fs::write(source.path().join("src/pages/index.html"), "<html>").unwrap();
        fs::write(source.path().join("README.md"), "# readme").unwrap();
        // Not in the configured set
        fs::write(source.path().join("notes.txt"), "private").unwrap();

        let manager = SyncManager::new(
            test_config(&source, &work),
            Arc::new(EventBus::default()),
        );
        manager.mirror().unwrap();

        assert_eq!(
            fs::read_to_string(work.path().join("src/pages/index.html")).unwrap(),
            "<html>"
        );
        assert_eq!(
            fs::read_to_string(work.path().join("README.md")).unwrap(),
            "# readme"
        );
        assert!(!work.path().join("notes.txt").exists());
    }

    #[test]
    fn test_mirror_skips_absent_sources() {
        let source = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();

        let manager = SyncManager::new(
            test_config(&source, &work),
            Arc::new(EventBus::default()),
        );
        // Nothing to mirror is not an error
        manager.mirror().unwrap();
    }

    #[test]
    fn test_missing_work_tree_is_fatal() {
        let source = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let mut config = test_config(&source, &work);
        config.work_tree = work.path().join("gone");

        let manager = SyncManager::new(config, Arc::new(EventBus::default()));
        let err = manager.mirror().unwrap_err();
        assert!(matches!(err, SyncError::MissingWorkTree(_)));
        assert!(!err.is_retryable());
    }
}
