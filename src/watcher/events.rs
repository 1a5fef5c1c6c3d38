//! Event-driven change source
//!
//! Wraps the platform filesystem watcher and accumulates a change count the
//! scheduler drains on every tick. Only create/modify/remove events on
//! visible paths are counted.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

/// Whether any component of `path` below `root` carries the hidden marker
fn in_hidden_path(root: &Path, path: &Path) -> bool {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components().any(|component| {
        matches!(
            component,
            Component::Normal(name) if name.to_str().is_some_and(|n| n.starts_with('.'))
        )
    })
}

/// Filesystem-event change source for one directory tree
pub struct FsEventSource {
    // Dropped with the source; dropping stops the underlying watcher.
    _watcher: RecommendedWatcher,
    counter: Arc<AtomicUsize>,
}

impl FsEventSource {
    /// Start watching `root` recursively
    pub fn start(root: &Path) -> notify::Result<Self> {
        let counter = Arc::new(AtomicUsize::new(0));
        let shared = counter.clone();
        let watch_root: PathBuf = root.to_path_buf();

        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    if !matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) {
                        return;
                    }
                    if event
                        .paths
                        .iter()
                        .any(|path| !in_hidden_path(&watch_root, path))
                    {
                        shared.fetch_add(1, Ordering::Relaxed);
                        trace!("fs event: {:?} {:?}", event.kind, event.paths);
                    }
                }
                Err(err) => warn!("filesystem watch error: {}", err),
            })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        Ok(Self {
            _watcher: watcher,
            counter,
        })
    }

    /// Changes observed since the last drain
    pub fn drain(&self) -> usize {
        self.counter.swap(0, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_hidden_path_filter() {
        let root = Path::new("/project/src");
        assert!(!in_hidden_path(root, Path::new("/project/src/main.js")));
        assert!(in_hidden_path(root, Path::new("/project/src/.cache/x")));
        assert!(in_hidden_path(root, Path::new("/project/src/sub/.swp")));
        // Dots in the root itself do not make children hidden
        assert!(!in_hidden_path(
            Path::new("/home/u/.config/proj"),
            Path::new("/home/u/.config/proj/file.js")
        ));
    }

    #[test]
    fn test_events_accumulate_and_drain() {
        let dir = TempDir::new().unwrap();
        let Ok(source) = FsEventSource::start(dir.path()) else {
            // Platform watcher unavailable in this environment
            return;
        };

        fs::write(dir.path().join("a.txt"), "a").unwrap();

        // Event delivery is asynchronous; poll briefly
        let mut seen = 0;
        for _ in 0..50 {
            seen += source.drain();
            if seen > 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        assert!(seen > 0, "no events observed for created file");
        assert_eq!(source.drain(), 0);
    }
}
