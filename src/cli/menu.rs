//! Interactive menu loop (no-subcommand invocation)

use anyhow::Result;
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use std::sync::Arc;

use super::output;
use crate::backup::BackupManager;
use crate::config::AppConfig;
use crate::events::EventBus;
use crate::scheduler::TriggerReason;
use crate::services::sync_watch::SyncWatchService;
use crate::sync::{SyncManager, SyncOutcome};

const MENU_ITEMS: &[&str] = &[
    "Create backup",
    "List backups",
    "Restore backup",
    "Compare backups",
    "Sync to git now",
    "Quit",
];

pub async fn interactive(
    config: &AppConfig,
    backups: &BackupManager,
    events: Arc<EventBus>,
) -> Result<()> {
    let theme = ColorfulTheme::default();
    println!("{}", style("backstop").bold().underlined());

    loop {
        let choice = Select::with_theme(&theme)
            .with_prompt("Menu")
            .items(MENU_ITEMS)
            .default(0)
            .interact()?;

        match choice {
            // Create backup
            0 => {
                let description: String = Input::with_theme(&theme)
                    .with_prompt("Description (empty for default)")
                    .allow_empty(true)
                    .interact_text()?;
                match backups.create(&description) {
                    Ok(record) => output::print_record(&record),
                    Err(err) => println!("{} {err}", style("error:").red().bold()),
                }
            }

            // List backups
            1 => output::print_record_list(&backups.list()?),

            // Restore backup
            2 => {
                let records = backups.list()?;
                if records.is_empty() {
                    println!("{}", style("No backups yet.").dim());
                    continue;
                }
                output::print_record_list(&records);

                let id: u64 = Input::with_theme(&theme)
                    .with_prompt("Backup id to restore")
                    .interact_text()?;
                let confirmed = Confirm::with_theme(&theme)
                    .with_prompt("Replace the current source tree with this backup?")
                    .default(false)
                    .interact()?;
                if !confirmed {
                    continue;
                }
                match backups.restore(id) {
                    Ok(record) => {
                        println!(
                            "{} restored backup #{}",
                            style("ok:").green().bold(),
                            record.id
                        );
                    }
                    Err(err) => println!("{} {err}", style("error:").red().bold()),
                }
            }

            // Compare backups
            3 => {
                let first: u64 = Input::with_theme(&theme)
                    .with_prompt("First backup id")
                    .interact_text()?;
                let second: u64 = Input::with_theme(&theme)
                    .with_prompt("Second backup id")
                    .interact_text()?;
                match (backups.find(first)?, backups.find(second)?) {
                    (Some(a), Some(b)) => output::print_comparison(&a, &b),
                    _ => println!("{} unknown backup id", style("error:").red().bold()),
                }
            }

            // Sync now
            4 => {
                let Some(sync_config) = config.sync_config() else {
                    println!(
                        "{} sync.work_tree is not configured",
                        style("error:").red().bold()
                    );
                    continue;
                };
                let manager = SyncManager::new(sync_config, events.clone());
                let message = SyncWatchService::describe(TriggerReason::Manual);
                match manager.sync(&message) {
                    Ok(SyncOutcome::Pushed { message }) => {
                        println!("{} pushed: {message}", style("ok:").green().bold());
                    }
                    Ok(SyncOutcome::NoChanges) => {
                        println!("{}", style("Working copy clean, nothing to sync.").dim());
                    }
                    Err(err) => println!("{} {err}", style("error:").red().bold()),
                }
            }

            // Quit
            _ => {
                println!("{}", style("Bye.").dim());
                return Ok(());
            }
        }
    }
}
