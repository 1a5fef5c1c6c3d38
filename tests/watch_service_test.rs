//! Watch service integration tests: trigger loop and shutdown hook

use backstop::backup::{BackupConfig, BackupManager};
use backstop::events::EventBus;
use backstop::scheduler::ScheduleConfig;
use backstop::services::backup_watch::BackupWatchService;
use backstop::services::{Service, Services};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn backup_manager(root: &Path, events: Arc<EventBus>) -> Arc<BackupManager> {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/app.js"), "console.log('hi')").unwrap();

    let config = BackupConfig {
        source_root: root.to_path_buf(),
        backup_dir: root.join("backups"),
        src_dir: "src".to_string(),
        docs_dir: "docs".to_string(),
        root_files: vec![],
    };
    Arc::new(BackupManager::new(config, events))
}

#[tokio::test]
async fn test_threshold_trigger_creates_backup() {
    let dir = TempDir::new().unwrap();
    let events = Arc::new(EventBus::default());
    let manager = backup_manager(dir.path(), events.clone());

    let schedule = ScheduleConfig {
        interval: Duration::from_secs(3600),
        max_changes: 3,
        poll_period: Duration::from_millis(100),
    };
    let service = Arc::new(BackupWatchService::new(
        manager.clone(),
        schedule,
        dir.path().join("src"),
        events,
    ));

    service.start().await.unwrap();
    assert!(service.is_running());

    // Let the change source settle before producing changes
    tokio::time::sleep(Duration::from_millis(300)).await;
    for index in 0..3 {
        fs::write(dir.path().join(format!("src/file{index}.js")), "x").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let mut created = false;
    for _ in 0..100 {
        if !manager.list().unwrap().is_empty() {
            created = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    service.stop().await.unwrap();
    assert!(!service.is_running());
    assert!(created, "no backup created after reaching the change threshold");

    let records = manager.list().unwrap();
    assert!(records[0].description.contains("automatic backup"));
}

#[tokio::test]
async fn test_interval_trigger_fires_without_changes() {
    let dir = TempDir::new().unwrap();
    let events = Arc::new(EventBus::default());
    let manager = backup_manager(dir.path(), events.clone());

    let schedule = ScheduleConfig {
        interval: Duration::from_millis(400),
        max_changes: 1000,
        poll_period: Duration::from_millis(100),
    };
    let service = Arc::new(BackupWatchService::new(
        manager.clone(),
        schedule,
        dir.path().join("src"),
        events,
    ));

    service.start().await.unwrap();

    let mut created = false;
    for _ in 0..50 {
        if !manager.list().unwrap().is_empty() {
            created = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    service.stop().await.unwrap();

    assert!(created, "interval trigger never fired");
    let records = manager.list().unwrap();
    assert!(records[0].description.contains("scheduled"));
}

#[tokio::test]
async fn test_shutdown_hook_takes_final_backup() {
    let dir = TempDir::new().unwrap();
    let events = Arc::new(EventBus::default());
    let manager = backup_manager(dir.path(), events.clone());

    let schedule = ScheduleConfig {
        interval: Duration::from_secs(3600),
        max_changes: 1000,
        poll_period: Duration::from_millis(100),
    };
    let service = Arc::new(BackupWatchService::new(
        manager.clone(),
        schedule,
        dir.path().join("src"),
        events.clone(),
    ));
    let services = Services::new(service, None, events);

    services.start_all().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    services.shutdown().await;

    let records = manager.list().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].description.contains("final backup"));
    assert!(!services.backup.is_running());
}
