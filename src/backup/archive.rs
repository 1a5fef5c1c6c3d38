//! Zip archive creation, verification and extraction

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::shared::walk::walk;
use super::BackupError;

/// What goes into one backup archive
#[derive(Debug, Clone)]
pub struct ArchiveSources {
    /// Directory trees, each stored under the given prefix
    pub dirs: Vec<(PathBuf, String)>,
    /// Individual files stored at the archive root
    pub files: Vec<PathBuf>,
}

/// Write a compressed archive of `sources` to `dest`.
///
/// Missing source paths are skipped silently (absent trees are benign).
/// Returns the archive size in bytes.
pub fn write_archive(dest: &Path, sources: &ArchiveSources) -> Result<u64, BackupError> {
    let file = File::create(dest)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    for (dir, prefix) in &sources.dirs {
        if !dir.is_dir() {
            trace!("skipping absent archive source: {}", dir.display());
            continue;
        }
        for entry in walk(dir) {
            let rel = entry.path.strip_prefix(dir).unwrap_or(&entry.path);
            let name = format!("{}/{}", prefix, rel.to_string_lossy().replace('\\', "/"));
            zip.start_file(name, options)?;
            let mut reader = File::open(&entry.path)?;
            io::copy(&mut reader, &mut zip)?;
        }
    }

    for path in &sources.files {
        if !path.is_file() {
            trace!("skipping absent archive source: {}", path.display());
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        zip.start_file(name, options)?;
        let mut reader = File::open(path)?;
        io::copy(&mut reader, &mut zip)?;
    }

    zip.finish()?;
    Ok(fs::metadata(dest)?.len())
}

/// Check that the archive opens and every entry is readable.
///
/// Run before anything destructive on a restore; a truncated or corrupt
/// archive must fail here, not after the live tree is gone.
pub fn verify_archive(path: &Path) -> Result<usize, BackupError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    for index in 0..archive.len() {
        archive.by_index(index)?;
    }
    Ok(archive.len())
}

/// Unpack the whole archive under `dest`
pub fn extract_archive(path: &Path, dest: &Path) -> Result<(), BackupError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    archive.extract(dest)?;
    Ok(())
}
