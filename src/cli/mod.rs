//! Command-line interface
//!
//! One-shot verbs (`create`, `list`, `restore`, `compare`, `sync`), the
//! foreground watcher (`watch`), and an interactive menu when invoked with
//! no subcommand.

pub mod menu;
pub mod output;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backup::BackupManager;
use crate::config::AppConfig;
use crate::events::EventBus;
use crate::scheduler::TriggerReason;
use crate::services::backup_watch::BackupWatchService;
use crate::services::sync_watch::SyncWatchService;
use crate::services::Services;
use crate::sync::{SyncManager, SyncOutcome};

#[derive(Parser)]
#[command(
    name = "backstop",
    version,
    about = "Change-triggered project backups and git sync"
)]
pub struct Cli {
    /// Path to the configuration file (default: ./backstop.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a backup now
    Create {
        /// Description stored with the backup
        description: Option<String>,
    },

    /// List stored backups
    List,

    /// Restore a backup by id (takes a safety backup first)
    Restore {
        id: u64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Compare two backups by id
    Compare { first: u64, second: u64 },

    /// Mirror into the git working copy, commit and push
    Sync {
        /// Commit message (a timestamp is appended)
        message: Option<String>,
    },

    /// Run the backup watcher in the foreground
    Watch {
        /// Also run the git sync watcher
        #[arg(long)]
        sync: bool,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let events = Arc::new(EventBus::default());
    let backups = BackupManager::new(config.backup_config(), events.clone());

    match cli.command {
        Some(Commands::Create { description }) => {
            let record = backups.create(description.as_deref().unwrap_or(""))?;
            println!("{} backup #{} created", style("ok:").green().bold(), record.id);
            output::print_record(&record);
        }

        Some(Commands::List) => {
            output::print_record_list(&backups.list()?);
        }

        Some(Commands::Restore { id, yes }) => {
            let record = backups
                .find(id)?
                .ok_or_else(|| anyhow!("no backup with id {id}"))?;
            output::print_record(&record);

            if !yes {
                let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt("Replace the current source tree with this backup?")
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("{}", style("Restore aborted.").dim());
                    return Ok(());
                }
            }

            let record = backups.restore(id)?;
            println!(
                "{} restored backup #{} ({})",
                style("ok:").green().bold(),
                record.id,
                record.description
            );
        }

        Some(Commands::Compare { first, second }) => {
            let a = backups
                .find(first)?
                .ok_or_else(|| anyhow!("no backup with id {first}"))?;
            let b = backups
                .find(second)?
                .ok_or_else(|| anyhow!("no backup with id {second}"))?;
            output::print_comparison(&a, &b);
        }

        Some(Commands::Sync { message }) => {
            let sync_config = config
                .sync_config()
                .ok_or_else(|| anyhow!("sync.work_tree is not configured"))?;
            let manager = SyncManager::new(sync_config, events.clone());
            let message =
                message.unwrap_or_else(|| SyncWatchService::describe(TriggerReason::Manual));
            match manager.sync(&message)? {
                SyncOutcome::Pushed { message } => {
                    println!("{} pushed: {message}", style("ok:").green().bold());
                }
                SyncOutcome::NoChanges => {
                    println!("{}", style("Working copy clean, nothing to sync.").dim());
                }
            }
        }

        Some(Commands::Watch { sync }) => {
            watch(&config, events, sync).await?;
        }

        None => {
            menu::interactive(&config, &backups, events.clone()).await?;
        }
    }
    Ok(())
}

/// Foreground watcher with ctrl-c shutdown hook
async fn watch(config: &AppConfig, events: Arc<EventBus>, with_sync: bool) -> Result<()> {
    let backups = Arc::new(BackupManager::new(config.backup_config(), events.clone()));
    let backup_service = Arc::new(BackupWatchService::new(
        backups,
        config.backup_schedule(),
        config.watch_root(),
        events.clone(),
    ));

    let sync_service = if with_sync {
        let sync_config = config
            .sync_config()
            .ok_or_else(|| anyhow!("sync.work_tree is not configured"))?;
        let manager = Arc::new(SyncManager::new(sync_config, events.clone()));
        Some(Arc::new(SyncWatchService::new(
            manager,
            config.sync_schedule(),
            config.watch_root(),
            events.clone(),
        )))
    } else {
        None
    };

    let printer = output::spawn_event_printer(&events);
    let services = Services::new(backup_service, sync_service, events);

    services.start_all().await?;
    println!(
        "{}",
        style("Watching for changes. Press Ctrl-C to stop.").bold()
    );

    let started = Instant::now();
    let status = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(600));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            println!(
                "{}",
                style(format!(
                    "still watching ({} min)",
                    started.elapsed().as_secs() / 60
                ))
                .dim()
            );
        }
    });

    tokio::signal::ctrl_c().await?;
    println!();
    status.abort();
    services.shutdown().await;
    printer.abort();
    println!("{}", style("Stopped.").bold());
    Ok(())
}
