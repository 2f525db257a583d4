//! Crash-recovery backups for in-place installs.
//!
//! A worker that gets killed while its mutant is installed in the real project
//! tree leaves a backup next to the module; the next worker restores it first.

use std::path::{Path, PathBuf};

pub const BACKUP_SUFFIX: &str = ".mutant-worker.bak";

pub fn backup_path(source_file: &Path) -> PathBuf {
    let mut backup = source_file.to_path_buf();
    let name = format!(
        ".{}{}",
        source_file.file_name().unwrap_or_default().to_string_lossy(),
        BACKUP_SUFFIX
    );
    backup.set_file_name(name);
    backup
}

pub fn write_backup(source_file: &Path, original: &str) -> std::io::Result<()> {
    std::fs::write(backup_path(source_file), original)
}

pub fn discard_backup(source_file: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(backup_path(source_file)) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Backup left behind by an interrupted in-place run, if any.
pub fn check_interrupted_run(source_file: &Path) -> Option<PathBuf> {
    let bak = backup_path(source_file);
    bak.exists().then_some(bak)
}

pub fn restore_from_backup(source_file: &Path, backup_file: &Path) -> std::io::Result<()> {
    std::fs::copy(backup_file, source_file)?;
    std::fs::remove_file(backup_file)?;
    crate::installer::clear_pycache(source_file);
    Ok(())
}

/// Restore `source_file` if a previous worker died with a mutant installed.
/// Returns whether anything was restored.
pub fn recover_interrupted(source_file: &Path) -> std::io::Result<bool> {
    match check_interrupted_run(source_file) {
        Some(bak) => {
            tracing::warn!(file = %source_file.display(), "restoring module left mutated by an interrupted worker");
            restore_from_backup(source_file, &bak)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
