//! Event bus for decoupled observation of watcher actions
//!
//! Background watchers must not crash, but they must not swallow failures
//! either: every action outcome is emitted here (and logged via `tracing`)
//! so any subscriber - the foreground CLI, a log sink, a test - can observe
//! what the unattended loops are doing.

use std::fmt;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// The two scheduled action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Backup,
    Sync,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Backup => write!(f, "backup"),
            ActionKind::Sync => write!(f, "sync"),
        }
    }
}

/// Result classification for a scheduled action run
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// The action completed
    Success { detail: String },
    /// The action deliberately did nothing (e.g. clean git tree)
    Skipped { reason: String },
    /// The action failed but a later tick may succeed
    Retryable { error: String },
    /// The action cannot succeed without operator intervention
    Fatal { error: String },
}

/// Watcher and action events
#[derive(Debug, Clone)]
pub enum Event {
    /// A watch service began observing a directory tree
    WatcherStarted { kind: ActionKind, root: PathBuf },

    /// A backup archive was written and recorded
    BackupCreated {
        id: u64,
        filename: String,
        size_bytes: u64,
        description: String,
    },

    /// A record fell off the retention window and its artifact was removed
    BackupEvicted { id: u64, filename: String },

    /// The working copy was committed and pushed
    SyncPushed { message: String },

    /// The working copy was clean; commit and push were skipped
    SyncSkipped,

    /// Classified outcome of one scheduled or unconditional action run
    ActionCompleted {
        kind: ActionKind,
        outcome: ActionOutcome,
    },

    /// The shutdown hook is running final actions
    ShuttingDown,
}

/// Broadcast bus for [`Event`]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event; send errors (no receivers) are ignored
    pub fn emit(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
