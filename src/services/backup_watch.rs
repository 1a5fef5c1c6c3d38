//! Change-triggered backup watcher
//!
//! Prefers the platform event watcher for change counting and falls back to
//! the polling detector when it cannot be started (missing watch root,
//! exhausted inotify handles).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::Service;
use crate::backup::BackupManager;
use crate::events::{ActionKind, ActionOutcome, Event, EventBus};
use crate::scheduler::{ScheduleConfig, Scheduler, TriggerReason};
use crate::watcher::events::FsEventSource;
use crate::watcher::ChangeDetector;

pub struct BackupWatchService {
    manager: Arc<BackupManager>,
    schedule: ScheduleConfig,
    root: PathBuf,
    events: Arc<EventBus>,
    running: AtomicBool,
    loop_handle: Mutex<Option<(oneshot::Sender<()>, JoinHandle<()>)>>,
}

impl BackupWatchService {
    pub fn new(
        manager: Arc<BackupManager>,
        schedule: ScheduleConfig,
        root: PathBuf,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            manager,
            schedule,
            root,
            events,
            running: AtomicBool::new(false),
            loop_handle: Mutex::new(None),
        }
    }

    /// Description stored with a backup taken for the given reason
    pub fn describe(reason: TriggerReason) -> String {
        match reason {
            TriggerReason::Threshold(count) => {
                format!("automatic backup after {count} file changes")
            }
            TriggerReason::Interval => "scheduled automatic backup".to_string(),
            TriggerReason::Manual => "manual backup".to_string(),
            TriggerReason::Shutdown => "final backup before shutdown".to_string(),
        }
    }

    fn run_action(manager: &BackupManager, events: &EventBus, description: &str) {
        let outcome = match manager.create(description) {
            Ok(record) => {
                info!("backup #{} written", record.id);
                ActionOutcome::Success {
                    detail: format!("backup #{} ({})", record.id, record.filename),
                }
            }
            Err(err) => {
                warn!("backup failed: {err}");
                ActionOutcome::Retryable {
                    error: err.to_string(),
                }
            }
        };
        events.emit(Event::ActionCompleted {
            kind: ActionKind::Backup,
            outcome,
        });
    }

    /// One unconditional invocation, outside the scheduler (shutdown hook)
    pub async fn run_once(&self, reason: TriggerReason) {
        let manager = self.manager.clone();
        let events = self.events.clone();
        let description = Self::describe(reason);
        let task = tokio::task::spawn_blocking(move || {
            Self::run_action(&manager, &events, &description);
        });
        if let Err(err) = task.await {
            warn!("backup task panicked: {err}");
        }
    }

    async fn run_loop(
        manager: Arc<BackupManager>,
        schedule: ScheduleConfig,
        root: PathBuf,
        events: Arc<EventBus>,
        mut stop: oneshot::Receiver<()>,
    ) {
        let source = match FsEventSource::start(&root) {
            Ok(source) => Some(source),
            Err(err) => {
                warn!("platform watcher unavailable ({err}), polling instead");
                None
            }
        };
        let mut detector = ChangeDetector::new(&root);
        if source.is_none() {
            // Seed baselines so pre-existing files do not count as changes
            detector.scan();
        }

        let mut scheduler = Scheduler::new(schedule.clone());
        let mut ticker = tokio::time::interval(schedule.poll_period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        events.emit(Event::WatcherStarted {
            kind: ActionKind::Backup,
            root: root.clone(),
        });
        info!(
            "backup watcher observing {} (every {:?} or {} changes)",
            root.display(),
            schedule.interval,
            schedule.max_changes
        );

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    let changes = match &source {
                        Some(source) => source.drain(),
                        None => detector.scan(),
                    };
                    scheduler.record_changes(changes);

                    if let Some(reason) = scheduler.poll(Instant::now()) {
                        let guard = scheduler.begin();
                        let manager = manager.clone();
                        let events = events.clone();
                        tokio::task::spawn_blocking(move || {
                            Self::run_action(&manager, &events, &Self::describe(reason));
                            drop(guard);
                        });
                    }
                }
            }
        }
        info!("backup watcher stopped");
    }
}

#[async_trait::async_trait]
impl Service for BackupWatchService {
    async fn start(&self) -> anyhow::Result<()> {
        let mut slot = self.loop_handle.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(Self::run_loop(
            self.manager.clone(),
            self.schedule.clone(),
            self.root.clone(),
            self.events.clone(),
            rx,
        ));
        *slot = Some((tx, handle));
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let Some((tx, handle)) = self.loop_handle.lock().await.take() else {
            return Ok(());
        };
        let _ = tx.send(());
        let _ = handle.await;
        self.running.store(false, Ordering::Release);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn name(&self) -> &'static str {
        "backup_watcher"
    }
}
