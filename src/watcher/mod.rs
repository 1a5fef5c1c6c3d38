//! Directory change detection
//!
//! Two change sources feed the schedulers: a polling [`ChangeDetector`] that
//! re-stats the watched tree and compares modification times against a
//! per-file baseline, and an event-driven [`events::FsEventSource`] backed by
//! the platform watcher. Both report a coarse "roughly N changes happened"
//! count; under-counting between polls is acceptable by contract.

pub mod events;

use crate::shared::walk::walk;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::debug;

/// Per-file modification-time baselines
///
/// An explicit state struct owned by the detector; there is no process-wide
/// watch state. Baselines for files that disappear from the tree are removed
/// on the scan that notices the deletion.
#[derive(Debug, Default)]
pub struct WatchState {
    baselines: HashMap<PathBuf, SystemTime>,
    primed: bool,
}

impl WatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files currently tracked
    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }

    /// Whether the first full scan has completed
    pub fn is_primed(&self) -> bool {
        self.primed
    }
}

/// Polling change detector over one directory tree
pub struct ChangeDetector {
    root: PathBuf,
    state: WatchState,
}

impl ChangeDetector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: WatchState::new(),
        }
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Walk the tree and count files that changed since the previous scan.
    ///
    /// The first scan seeds the baselines and reports zero. After that, a
    /// strictly newer modification time, a file without a baseline (created)
    /// or a baseline without a file (deleted) each count as one change.
    /// A missing root is a no-op and leaves the state untouched.
    pub fn scan(&mut self) -> usize {
        if !self.root.is_dir() {
            return 0;
        }

        let primed = self.state.primed;
        let mut seen = HashSet::new();
        let mut changes = 0;

        for entry in walk(&self.root) {
            seen.insert(entry.path.clone());
            match self.state.baselines.get(&entry.path) {
                Some(baseline) if entry.modified > *baseline => {
                    changes += 1;
                    self.state.baselines.insert(entry.path, entry.modified);
                }
                Some(_) => {}
                None => {
                    if primed {
                        changes += 1;
                    }
                    self.state.baselines.insert(entry.path, entry.modified);
                }
            }
        }

        let removed: Vec<PathBuf> = self
            .state
            .baselines
            .keys()
            .filter(|path| !seen.contains(*path))
            .cloned()
            .collect();
        for path in removed {
            self.state.baselines.remove(&path);
            if primed {
                changes += 1;
            }
        }

        self.state.primed = true;
        if changes > 0 {
            debug!(
                "detected {} change(s) under {} ({} files tracked)",
                changes,
                self.root.display(),
                self.state.len()
            );
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_first_scan_seeds_without_counting() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();

        let mut detector = ChangeDetector::new(dir.path());
        assert_eq!(detector.scan(), 0);
        assert_eq!(detector.state().len(), 2);
        assert!(detector.state().is_primed());
    }

    #[test]
    fn test_modified_file_counts_once() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "a").unwrap();

        let mut detector = ChangeDetector::new(dir.path());
        detector.scan();

        // Age the baseline instead of sleeping past mtime granularity
        let baseline = detector.state.baselines.get_mut(&file).unwrap();
        *baseline = SystemTime::UNIX_EPOCH + Duration::from_secs(1);

        assert_eq!(detector.scan(), 1);
        // Unchanged on the next pass
        assert_eq!(detector.scan(), 0);
    }

    #[test]
    fn test_new_file_counts_after_priming() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let mut detector = ChangeDetector::new(dir.path());
        detector.scan();

        fs::write(dir.path().join("b.txt"), "b").unwrap();
        assert_eq!(detector.scan(), 1);
        assert_eq!(detector.state().len(), 2);
    }

    #[test]
    fn test_deleted_file_counts_and_drops_baseline() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "a").unwrap();

        let mut detector = ChangeDetector::new(dir.path());
        detector.scan();

        fs::remove_file(&file).unwrap();
        assert_eq!(detector.scan(), 1);
        assert!(detector.state().is_empty());
    }

    #[test]
    fn test_missing_root_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut detector = ChangeDetector::new(dir.path().join("gone"));
        assert_eq!(detector.scan(), 0);
        assert!(!detector.state().is_primed());
    }

    #[test]
    fn test_hidden_files_ignored() {
        let dir = TempDir::new().unwrap();
        let mut detector = ChangeDetector::new(dir.path());
        detector.scan();

        fs::write(dir.path().join(".hidden"), "x").unwrap();
        assert_eq!(detector.scan(), 0);
    }
}
