//! Lazy recursive directory traversal
//!
//! One walker shared by the change detector, the backup file counter and the
//! mirror copier. Hidden entries (leading `.`) are skipped, a missing root
//! yields an empty walk, and unreadable entries are dropped rather than
//! surfaced.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;

/// Metadata for one regular file produced by the walk
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub len: u64,
}

/// Whether an entry name carries the hidden-file marker
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Iterator over the visible regular files under a root directory
pub struct Walk {
    pending_dirs: Vec<PathBuf>,
    current: Option<fs::ReadDir>,
}

/// Walk `root` depth-first, yielding every visible regular file
pub fn walk(root: impl Into<PathBuf>) -> Walk {
    let root = root.into();
    Walk {
        pending_dirs: if root.is_dir() { vec![root] } else { Vec::new() },
        current: None,
    }
}

/// Recursive count of visible files under `root`
pub fn count_files(root: impl Into<PathBuf>) -> usize {
    walk(root).count()
}

impl Iterator for Walk {
    type Item = FileEntry;

    fn next(&mut self) -> Option<FileEntry> {
        loop {
            let Some(read_dir) = self.current.as_mut() else {
                let dir = self.pending_dirs.pop()?;
                match fs::read_dir(&dir) {
                    Ok(read_dir) => self.current = Some(read_dir),
                    Err(err) => trace!("skipping unreadable directory {}: {}", dir.display(), err),
                }
                continue;
            };

            match read_dir.next() {
                Some(Ok(entry)) => {
                    let path = entry.path();
                    if is_hidden(&path) {
                        continue;
                    }
                    let Ok(metadata) = entry.metadata() else {
                        trace!("skipping unreadable entry: {}", path.display());
                        continue;
                    };
                    if metadata.is_dir() {
                        self.pending_dirs.push(path);
                    } else if metadata.is_file() {
                        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                        return Some(FileEntry {
                            path,
                            modified,
                            len: metadata.len(),
                        });
                    }
                }
                Some(Err(err)) => trace!("read_dir error: {}", err),
                None => self.current = None,
            }
        }
    }
}
