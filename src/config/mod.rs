//! Application configuration
//!
//! An optional JSON file next to the project (`backstop.json`). Absent file
//! means defaults; a malformed file is an error at startup. The per-watcher
//! sections recognize `interval` (milliseconds) and `maxChanges` (count),
//! falling back to the hard-coded defaults when absent.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::backup::BackupConfig;
use crate::scheduler::ScheduleConfig;
use crate::sync::SyncConfig;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "backstop.json";

/// Per-watcher trigger overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Milliseconds between unconditional runs
    pub interval: Option<u64>,
    /// Changes before an early run
    #[serde(rename = "maxChanges")]
    pub max_changes: Option<u32>,
}

impl WatchSettings {
    fn apply(&self, mut schedule: ScheduleConfig) -> ScheduleConfig {
        if let Some(millis) = self.interval {
            schedule.interval = Duration::from_millis(millis);
        }
        if let Some(count) = self.max_changes {
            schedule.max_changes = count;
        }
        schedule
    }
}

/// Git mirror settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// The separate git working copy; sync is unavailable until this is set
    pub work_tree: Option<PathBuf>,
    /// Directories mirrored recursively
    pub dirs: Vec<String>,
    /// Files mirrored individually
    pub files: Vec<String>,
    pub remote: String,
    pub branch: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            work_tree: None,
            dirs: vec!["src".into(), "docs".into(), "scripts".into()],
            files: vec!["README.md".into(), "package.json".into(), ".gitignore".into()],
            remote: "origin".into(),
            branch: "master".into(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Project root everything else is resolved against
    pub source_root: PathBuf,

    /// Backup store directory; relative paths resolve under the project root
    pub backup_dir: PathBuf,

    /// Watched/archived source tree name
    pub src_dir: String,

    /// Docs tree name
    pub docs_dir: String,

    /// Named root files included in every archive
    pub root_files: Vec<String>,

    /// Backup watcher trigger overrides
    pub backup_watch: WatchSettings,

    /// Sync watcher trigger overrides
    pub sync_watch: WatchSettings,

    /// Git mirror settings
    pub sync: SyncSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("."),
            backup_dir: PathBuf::from("backups"),
            src_dir: "src".into(),
            docs_dir: "docs".into(),
            root_files: vec!["package.json".into(), "README.md".into()],
            backup_watch: WatchSettings::default(),
            sync_watch: WatchSettings::default(),
            sync: SyncSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit path, or from `backstop.json` in the working
    /// directory when none is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path.unwrap_or_else(|| Path::new(CONFIG_FILE)))
    }

    /// Load configuration; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading config from {:?}", path);
            let json = fs::read_to_string(path)
                .with_context(|| format!("could not read config file {}", path.display()))?;
            let config: AppConfig = serde_json::from_str(&json)
                .with_context(|| format!("malformed config file {}", path.display()))?;
            Ok(config)
        } else {
            debug!("No config found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Backup store directory resolved against the project root
    pub fn resolved_backup_dir(&self) -> PathBuf {
        if self.backup_dir.is_absolute() {
            self.backup_dir.clone()
        } else {
            self.source_root.join(&self.backup_dir)
        }
    }

    /// The directory tree the watchers observe
    pub fn watch_root(&self) -> PathBuf {
        self.source_root.join(&self.src_dir)
    }

    pub fn backup_config(&self) -> BackupConfig {
        BackupConfig {
            source_root: self.source_root.clone(),
            backup_dir: self.resolved_backup_dir(),
            src_dir: self.src_dir.clone(),
            docs_dir: self.docs_dir.clone(),
            root_files: self.root_files.clone(),
        }
    }

    /// Sync configuration, when a working copy is set up
    pub fn sync_config(&self) -> Option<SyncConfig> {
        let work_tree = self.sync.work_tree.clone()?;
        Some(SyncConfig {
            source_root: self.source_root.clone(),
            work_tree,
            dirs: self.sync.dirs.clone(),
            files: self.sync.files.clone(),
            remote: self.sync.remote.clone(),
            branch: self.sync.branch.clone(),
            log_dir: self.resolved_backup_dir(),
        })
    }

    pub fn backup_schedule(&self) -> ScheduleConfig {
        self.backup_watch.apply(ScheduleConfig::backup_defaults())
    }

    pub fn sync_schedule(&self) -> ScheduleConfig {
        self.sync_watch.apply(ScheduleConfig::sync_defaults())
    }
}
