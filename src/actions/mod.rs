//! File actions module.
//!
//! This module provides remediation for confirmed duplicates:
//! - Choosing the surviving copy of each group ([`plan`])
//! - Deletion with an optional timestamped backup ([`delete`])
//! - Moving duplicates into a holding directory ([`relocate`])
//!
//! Every action re-verifies the file against the snapshot taken when it was
//! planned and refuses to touch a file that changed since (TOCTOU guard).
//! Per-file failures are collected and never abort a batch.
//!
//! ```no_run
//! use dupehunter::actions::{apply, plan_all, Action, KeepStrategy};
//! use dupehunter::duplicates::{scan, ScanConfig};
//! use std::path::Path;
//!
//! let result = scan(Path::new("/data"), ScanConfig::default()).unwrap();
//! let plans = plan_all(result.duplicate_groups.values(), KeepStrategy::Oldest);
//! let batch = apply(&plans, &Action::Delete { backup_dir: None }, true);
//! println!("{}", batch.summary());
//! ```

pub mod delete;
pub mod plan;
pub mod relocate;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use delete::{create_backup, delete_with_backup};
pub use plan::{plan_all, plan_group, ActionPlan, FileSnapshot, KeepStrategy};
pub use relocate::{move_to_dir, unique_destination};

/// Error type for file actions.
#[derive(Debug, Error)]
pub enum ActionError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when touching the file.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File was modified since scan (TOCTOU protection).
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// The backup copy could not be written; the original was left alone.
    #[error("backup of {path} failed: {source}")]
    BackupFailed {
        /// File that was being backed up
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ActionError {
    /// Classify an I/O error raised while accessing `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Modified(p) => p,
            Self::BackupFailed { path, .. } | Self::Io { path, .. } => path,
        }
    }
}

/// What to do with the files an [`ActionPlan`] removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Delete, copying to `backup_dir` first when set
    Delete {
        /// Directory receiving timestamped backups
        backup_dir: Option<PathBuf>,
    },
    /// Move into `dest_dir`, renaming on collision
    Move {
        /// Holding directory
        dest_dir: PathBuf,
    },
}

impl Action {
    fn verb(&self) -> &'static str {
        match self {
            Self::Delete { .. } => "Deleted",
            Self::Move { .. } => "Moved",
        }
    }
}

/// One file successfully handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Original location
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Where the file (or its backup) now lives, if anywhere
    pub destination: Option<PathBuf>,
}

/// Results of a batch of actions.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Files handled successfully (or that would be, in a dry run)
    pub successes: Vec<ActionOutcome>,
    /// Files that failed, with the reason
    pub failures: Vec<(PathBuf, String)>,
    /// Bytes removed from their original locations
    pub bytes_freed: u64,
    /// Whether nothing was actually touched
    pub dry_run: bool,
    verb: &'static str,
}

impl BatchResult {
    /// Number of successful actions.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed actions.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if all actions succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let prefix = if self.dry_run { "[dry run] Would have " } else { "" };
        let verb = if self.dry_run {
            self.verb.to_lowercase()
        } else {
            self.verb.to_string()
        };
        if self.all_succeeded() {
            format!(
                "{prefix}{verb} {} file(s), {} freed",
                self.success_count(),
                bytesize::ByteSize::b(self.bytes_freed)
            )
        } else {
            format!(
                "{prefix}{verb} {} file(s), {} failed, {} freed",
                self.success_count(),
                self.failure_count(),
                bytesize::ByteSize::b(self.bytes_freed)
            )
        }
    }
}

/// Carry out `action` for every removal in `plans`.
///
/// The kept copy of each plan is verified first; if it is gone or changed
/// since the scan, the whole group is skipped and every removal in it is
/// recorded as a failure. Each removal is then verified against its own
/// snapshot, and a changed or vanished file is recorded as a failure and
/// skipped. With `dry_run` nothing is touched and every verified file is
/// reported as a success.
#[must_use]
pub fn apply(plans: &[ActionPlan], action: &Action, dry_run: bool) -> BatchResult {
    let mut result = BatchResult {
        dry_run,
        verb: action.verb(),
        ..Default::default()
    };

    for plan in plans {
        if let Err(e) = plan.keep.verify() {
            log::warn!(
                "Skipping group of {}: kept copy failed verification: {}",
                plan.keep.path.display(),
                e
            );
            let reason = format!("kept copy not verified: {e}");
            for snapshot in &plan.remove {
                result.failures.push((snapshot.path.clone(), reason.clone()));
            }
            continue;
        }

        for snapshot in &plan.remove {
            let outcome = snapshot.verify().and_then(|()| {
                if dry_run {
                    log::info!("[dry run] {}", snapshot.path.display());
                    return Ok(ActionOutcome {
                        path: snapshot.path.clone(),
                        size: snapshot.size,
                        destination: None,
                    });
                }
                match action {
                    Action::Delete { backup_dir } => {
                        delete_with_backup(&snapshot.path, backup_dir.as_deref())
                    }
                    Action::Move { dest_dir } => move_to_dir(&snapshot.path, dest_dir),
                }
            });

            match outcome {
                Ok(done) => {
                    result.bytes_freed += done.size;
                    result.successes.push(done);
                }
                Err(e) => {
                    log::warn!("Failed to process {}: {}", snapshot.path.display(), e);
                    result.failures.push((snapshot.path.clone(), e.to_string()));
                }
            }
        }
    }

    log::info!("{}", result.summary());
    result
}
