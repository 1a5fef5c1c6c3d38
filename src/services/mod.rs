//! Background watcher services
//!
//! Each watch service owns one change source, one scheduler and one action.
//! The [`Services`] container wires them to a shared event bus and runs the
//! shutdown hook: one final unconditional action per active service, bounded
//! by a grace period.

pub mod backup_watch;
pub mod sync_watch;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::events::{Event, EventBus};
use crate::scheduler::TriggerReason;
use self::backup_watch::BackupWatchService;
use self::sync_watch::SyncWatchService;

/// How long the shutdown hook waits for the final actions
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Trait for background services
#[async_trait]
pub trait Service: Send + Sync {
    /// Start the service
    async fn start(&self) -> Result<()>;

    /// Stop the service gracefully
    async fn stop(&self) -> Result<()>;

    /// Check if the service is running
    fn is_running(&self) -> bool;

    /// Get service name for logging
    fn name(&self) -> &'static str;
}

/// Container for the watcher services
pub struct Services {
    pub backup: Arc<BackupWatchService>,
    pub sync: Option<Arc<SyncWatchService>>,
    events: Arc<EventBus>,
}

impl Services {
    pub fn new(
        backup: Arc<BackupWatchService>,
        sync: Option<Arc<SyncWatchService>>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            backup,
            sync,
            events,
        }
    }

    /// Start all configured services
    pub async fn start_all(&self) -> Result<()> {
        info!("Starting watcher services");
        self.backup.start().await?;
        if let Some(sync) = &self.sync {
            sync.start().await?;
        }
        Ok(())
    }

    /// Stop all services gracefully
    pub async fn stop_all(&self) -> Result<()> {
        info!("Stopping watcher services");
        self.backup.stop().await?;
        if let Some(sync) = &self.sync {
            sync.stop().await?;
        }
        Ok(())
    }

    /// Shutdown hook: run one final unconditional action per active service,
    /// racing the grace period, then stop the loops.
    pub async fn shutdown(&self) {
        self.events.emit(Event::ShuttingDown);

        let final_actions = async {
            self.backup.run_once(TriggerReason::Shutdown).await;
            if let Some(sync) = &self.sync {
                sync.run_once(TriggerReason::Shutdown).await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, final_actions)
            .await
            .is_err()
        {
            warn!("shutdown grace period elapsed before final actions completed");
        }

        if let Err(err) = self.stop_all().await {
            warn!("error stopping services: {err:#}");
        }
    }
}
