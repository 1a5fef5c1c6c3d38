//! Shared utilities

pub mod walk;

use std::fs;
use std::io;
use std::path::Path;

use self::walk::walk;

/// Format a byte count for display
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Copy every visible file under `src` into the same relative position under
/// `dest`, creating directories as needed. Existing files are overwritten.
///
/// Returns the number of files copied.
pub fn copy_tree(src: &Path, dest: &Path) -> io::Result<usize> {
    let mut copied = 0;
    for entry in walk(src) {
        let rel = entry.path.strip_prefix(src).unwrap_or(&entry.path);
        let target = dest.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&entry.path, &target)?;
        copied += 1;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_copy_tree_preserves_layout() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        fs::create_dir_all(src.path().join("nested/deep")).unwrap();
        fs::write(src.path().join("a.txt"), "a").unwrap();
        fs::write(src.path().join("nested/deep/b.txt"), "b").unwrap();

        let copied = copy_tree(src.path(), dest.path()).unwrap();
        assert_eq!(copied, 2);
        assert_eq!(
            fs::read_to_string(dest.path().join("nested/deep/b.txt")).unwrap(),
            "b"
        );
    }

    #[test]
    fn test_copy_tree_overwrites() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        fs::write(src.path().join("a.txt"), "new").unwrap();
        fs::write(dest.path().join("a.txt"), "old").unwrap();

        copy_tree(src.path(), dest.path()).unwrap();
        assert_eq!(fs::read_to_string(dest.path().join("a.txt")).unwrap(), "new");
    }
}
