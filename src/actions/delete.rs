//! Deletion with an optional timestamped backup.
//!
//! # Safety
//!
//! When a backup directory is given the file is copied there first, named
//! `YYYYmmdd_HHMMSS_<original name>`. If the copy fails the original is not
//! deleted.

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use chrono::Local;

use super::relocate::unique_destination;
use super::{ActionError, ActionOutcome};

/// Copy `path` into `backup_dir` under a timestamped name.
///
/// Creates `backup_dir` if needed. Name collisions within the same second
/// get a numeric suffix.
///
/// # Errors
///
/// Returns [`ActionError::BackupFailed`] if the directory cannot be created
/// or the copy fails.
pub fn create_backup(path: &Path, backup_dir: &Path) -> Result<std::path::PathBuf, ActionError> {
    let backup_failed = |source: std::io::Error| ActionError::BackupFailed {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(backup_dir).map_err(backup_failed)?;

    let mut name = OsString::from(Local::now().format("%Y%m%d_%H%M%S_").to_string());
    name.push(path.file_name().unwrap_or(path.as_os_str()));
    let destination = unique_destination(backup_dir, &name);

    fs::copy(path, &destination).map_err(backup_failed)?;
    log::debug!(
        "Backed up {} to {}",
        path.display(),
        destination.display()
    );

    Ok(destination)
}

/// Delete `path`, backing it up into `backup_dir` first when given.
///
/// # Errors
///
/// - `BackupFailed` if the backup could not be written (nothing is deleted)
/// - `NotFound`/`PermissionDenied`/`Io` if the removal fails
///
/// # Example
///
/// ```no_run
/// use dupehunter::actions::delete_with_backup;
/// use std::path::Path;
///
/// let outcome = delete_with_backup(Path::new("/data/copy.jpg"), Some(Path::new("/backups")))
///     .unwrap();
/// println!("backup at {:?}", outcome.destination);
/// ```
pub fn delete_with_backup(
    path: &Path,
    backup_dir: Option<&Path>,
) -> Result<ActionOutcome, ActionError> {
    let size = fs::metadata(path)
        .map_err(|e| ActionError::from_io(path, e))?
        .len();

    let destination = match backup_dir {
        Some(dir) => Some(create_backup(path, dir)?),
        None => None,
    };

    fs::remove_file(path).map_err(|e| {
        log::error!("Delete failed for {}: {}", path.display(), e);
        ActionError::from_io(path, e)
    })?;

    log::info!("Deleted: {} ({} bytes)", path.display(), size);

    Ok(ActionOutcome {
        path: path.to_path_buf(),
        size,
        destination,
    })
}
