//! Change-triggered git sync watcher
//!
//! Uses the polling detector (a stat walk every poll period) rather than the
//! platform watcher: sync polls are coarse (30 s) and the walk doubles as
//! cleanup of baselines for deleted files.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::Service;
use crate::events::{ActionKind, ActionOutcome, Event, EventBus};
use crate::scheduler::{ScheduleConfig, Scheduler, TriggerReason};
use crate::sync::{SyncManager, SyncOutcome};
use crate::watcher::ChangeDetector;

pub struct SyncWatchService {
    manager: Arc<SyncManager>,
    schedule: ScheduleConfig,
    root: PathBuf,
    events: Arc<EventBus>,
    running: AtomicBool,
    loop_handle: Mutex<Option<(oneshot::Sender<()>, JoinHandle<()>)>>,
}

impl SyncWatchService {
    pub fn new(
        manager: Arc<SyncManager>,
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

    /// Commit message for a sync triggered for the given reason
    pub fn describe(reason: TriggerReason) -> String {
        match reason {
            TriggerReason::Threshold(count) => {
                format!("automatic sync after {count} file changes")
            }
            TriggerReason::Interval => "scheduled automatic sync".to_string(),
            TriggerReason::Manual => "manual sync".to_string(),
            TriggerReason::Shutdown => "final sync before shutdown".to_string(),
        }
    }

    fn run_action(manager: &SyncManager, events: &EventBus, message: &str) {
        let outcome = match manager.sync(message) {
            Ok(SyncOutcome::Pushed { message }) => ActionOutcome::Success { detail: message },
            Ok(SyncOutcome::NoChanges) => ActionOutcome::Skipped {
                reason: "working copy clean".to_string(),
            },
            Err(err) => {
                warn!("sync failed: {err}");
                if err.is_retryable() {
                    ActionOutcome::Retryable {
                        error: err.to_string(),
                    }
                } else {
                    ActionOutcome::Fatal {
                        error: err.to_string(),
                    }
                }
            }
        };
        events.emit(Event::ActionCompleted {
            kind: ActionKind::Sync,
            outcome,
        });
    }

    /// One unconditional invocation, outside the scheduler (shutdown hook)
    pub async fn run_once(&self, reason: TriggerReason) {
        let manager = self.manager.clone();
        let events = self.events.clone();
        let message = Self::describe(reason);
        let task = tokio::task::spawn_blocking(move || {
            Self::run_action(&manager, &events, &message);
        });
        if let Err(err) = task.await {
            warn!("sync task panicked: {err}");
        }
    }

    async fn run_loop(
        manager: Arc<SyncManager>,
        schedule: ScheduleConfig,
        root: PathBuf,
        events: Arc<EventBus>,
        mut stop: oneshot::Receiver<()>,
    ) {
        let mut detector = ChangeDetector::new(&root);
        detector.scan();

        let mut scheduler = Scheduler::new(schedule.clone());
        let mut ticker = tokio::time::interval(schedule.poll_period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        events.emit(Event::WatcherStarted {
            kind: ActionKind::Sync,
            root: root.clone(),
        });
        info!(
            "sync watcher observing {} (every {:?} or {} changes)",
            root.display(),
            schedule.interval,
            schedule.max_changes
        );

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    scheduler.record_changes(detector.scan());

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
        info!("sync watcher stopped");
    }
}

#[async_trait::async_trait]
impl Service for SyncWatchService {
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
        "sync_watcher"
    }
}
