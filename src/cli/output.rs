//! Styled terminal output helpers

use chrono::Local;
use console::style;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::backup::metadata::BackupRecord;
use crate::events::{ActionOutcome, Event, EventBus};
use crate::shared::format_bytes;

/// Print one backup record
pub fn print_record(record: &BackupRecord) {
    let local = record.created_at.with_timezone(&Local);
    println!(
        "{} [{}] {}",
        style(format!("#{}", record.id)).yellow().bold(),
        style(local.format("%Y-%m-%d %H:%M:%S")).dim(),
        record.description
    );
    println!(
        "   {} {}  {} {}  {} {}",
        style("file:").bold(),
        record.filename,
        style("size:").bold(),
        format_bytes(record.size_bytes),
        style("files:").bold(),
        record.file_count
    );
}

/// Print the full record list, oldest first
pub fn print_record_list(records: &[BackupRecord]) {
    if records.is_empty() {
        println!("{}", style("No backups yet.").dim());
        return;
    }
    println!("{}", style("Backups").bold().underlined());
    for record in records {
        print_record(record);
    }
}

/// Print two records and the time between them
pub fn print_comparison(first: &BackupRecord, second: &BackupRecord) {
    print_record(first);
    print_record(second);

    let delta = second.created_at.signed_duration_since(first.created_at);
    let hours = delta.num_minutes().abs() as f64 / 60.0;
    let growth = second.size_bytes as i64 - first.size_bytes as i64;
    println!(
        "\n{} {:.1} h  {} {}{}",
        style("time between:").bold(),
        hours,
        style("size delta:").bold(),
        if growth >= 0 { "+" } else { "-" },
        format_bytes(growth.unsigned_abs())
    );
}

fn print_event(event: &Event) {
    match event {
        Event::WatcherStarted { kind, root } => {
            println!(
                "{} {} watcher observing {}",
                style("watch:").cyan().bold(),
                kind,
                root.display()
            );
        }
        Event::BackupCreated {
            id,
            filename,
            size_bytes,
            description,
        } => {
            println!(
                "{} #{id} {filename} ({}) - {description}",
                style("backup:").green().bold(),
                format_bytes(*size_bytes)
            );
        }
        Event::BackupEvicted { id, filename } => {
            println!(
                "{} dropped old backup #{id} ({filename})",
                style("retention:").dim()
            );
        }
        Event::SyncPushed { message } => {
            println!("{} {message}", style("sync:").green().bold());
        }
        Event::SyncSkipped => {
            println!("{}", style("sync: working copy clean, skipped").dim());
        }
        Event::ActionCompleted { kind, outcome } => match outcome {
            // Successes and skips are reported by their specific events
            ActionOutcome::Success { .. } | ActionOutcome::Skipped { .. } => {}
            ActionOutcome::Retryable { error } => {
                println!(
                    "{} {kind} failed (will retry on next trigger): {error}",
                    style("error:").red().bold()
                );
            }
            ActionOutcome::Fatal { error } => {
                println!(
                    "{} {kind} failed (needs attention): {error}",
                    style("error:").red().bold()
                );
            }
        },
        Event::ShuttingDown => {
            println!("{}", style("running final actions...").bold());
        }
    }
}

/// Forward watcher events to the terminal until the bus closes
pub fn spawn_event_printer(events: &EventBus) -> JoinHandle<()> {
    let mut receiver = events.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: u64) -> BackupRecord {
        BackupRecord {
            id,
            filename: format!("backup_{id}.zip"),
            created_at: Utc::now(),
            description: "test".to_string(),
            size_bytes: 2048,
            file_count: 3,
        }
    }

    // Exercises every styled formatting path
    #[test]
    fn test_printers_accept_records_and_events() {
        print_record_list(&[]);
        print_record_list(&[record(1), record(2)]);
        print_comparison(&record(1), &record(2));
        print_event(&Event::ShuttingDown);
        print_event(&Event::ActionCompleted {
            kind: crate::events::ActionKind::Backup,
            outcome: ActionOutcome::Retryable {
                error: "disk full".to_string(),
            },
        });
    }
}
