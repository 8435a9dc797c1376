//! Moving duplicates into a holding directory.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use super::{ActionError, ActionOutcome};

/// First free path in `dir` for `file_name`.
///
/// Tries `name.ext`, then `name_1.ext`, `name_2.ext`, and so on.
#[must_use]
pub fn unique_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(file_name);
    let stem = as_path.file_stem().unwrap_or(file_name);
    let ext = as_path.extension();

    (1u64..)
        .map(|n| {
            let mut name = OsString::from(stem);
            name.push(format!("_{n}"));
            if let Some(ext) = ext {
                name.push(".");
                name.push(ext);
            }
            dir.join(name)
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Move `path` into `dest_dir`, creating it if needed.
///
/// Falls back to copy-then-remove when a plain rename fails (for example
/// across filesystems).
///
/// # Errors
///
/// Returns [`ActionError`] if the directory cannot be created or the file
/// can be neither renamed nor copied.
pub fn move_to_dir(path: &Path, dest_dir: &Path) -> Result<ActionOutcome, ActionError> {
    let size = fs::metadata(path)
        .map_err(|e| ActionError::from_io(path, e))?
        .len();

    fs::create_dir_all(dest_dir).map_err(|e| ActionError::from_io(dest_dir, e))?;

    let destination = unique_destination(dest_dir, path.file_name().unwrap_or(path.as_os_str()));

    if let Err(rename_err) = fs::rename(path, &destination) {
        log::debug!(
            "Rename of {} failed ({}), copying instead",
            path.display(),
            rename_err
        );
        fs::copy(path, &destination).map_err(|_| ActionError::from_io(path, rename_err))?;
        if let Err(e) = fs::remove_file(path) {
            let _ = fs::remove_file(&destination);
            return Err(ActionError::from_io(path, e));
        }
    }

    log::info!("Moved: {} -> {}", path.display(), destination.display());

    Ok(ActionOutcome {
        path: path.to_path_buf(),
        size,
        destination: Some(destination),
    })
}
