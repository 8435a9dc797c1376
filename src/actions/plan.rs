//! Choosing which copy of a duplicate group to keep.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::ActionError;
use crate::duplicates::DuplicateGroup;

/// Which member of a duplicate group survives remediation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeepStrategy {
    /// The first file in discovery order
    #[default]
    First,
    /// The file with the oldest modification time
    Oldest,
    /// The file with the newest modification time
    Newest,
}

/// File metadata snapshot for TOCTOU verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// Path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub mtime: Option<SystemTime>,
}

impl FileSnapshot {
    /// Create a snapshot of a file's current state.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or can't be accessed.
    pub fn capture(path: &Path) -> Result<Self, ActionError> {
        let metadata = fs::metadata(path).map_err(|e| ActionError::from_io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            mtime: metadata.modified().ok(),
        })
    }

    /// Verify that the file still matches this snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Modified`] if size or mtime changed, or the
    /// capture error if the file is gone.
    pub fn verify(&self) -> Result<(), ActionError> {
        let current = Self::capture(&self.path)?;

        if let (Some(orig), Some(curr)) = (self.mtime, current.mtime) {
            if orig != curr {
                log::warn!(
                    "File modified since scan: {} (mtime changed)",
                    self.path.display()
                );
                return Err(ActionError::Modified(self.path.clone()));
            }
        }

        if self.size != current.size {
            log::warn!(
                "File modified since scan: {} (size changed from {} to {})",
                self.path.display(),
                self.size,
                current.size
            );
            return Err(ActionError::Modified(self.path.clone()));
        }

        Ok(())
    }
}

/// What to do with one duplicate group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPlan {
    /// The surviving copy, which must still match before anything is removed
    pub keep: FileSnapshot,
    /// Copies to delete or move, with the state they must still be in
    pub remove: Vec<FileSnapshot>,
}

impl ActionPlan {
    /// Bytes freed if every removal succeeds.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.remove.iter().map(|s| s.size).sum()
    }
}

/// Decide which file of `group` to keep and which to remove.
///
/// Snapshots use the group size and the modification time recorded when the
/// scan discovered each member. Members without a recorded time fall back to
/// their current metadata. Files with no known modification time are never
/// chosen as the kept copy by `Oldest`/`Newest`; ties keep discovery order.
/// Returns `None` for a group with fewer than two members.
#[must_use]
pub fn plan_group(group: &DuplicateGroup, strategy: KeepStrategy) -> Option<ActionPlan> {
    if group.len() < 2 {
        return None;
    }

    let mut members: Vec<FileSnapshot> = group
        .files
        .iter()
        .map(|p| FileSnapshot {
            path: p.clone(),
            size: group.size(),
            mtime: group
                .scanned_modified(p)
                .or_else(|| fs::metadata(p).and_then(|m| m.modified()).ok()),
        })
        .collect();

    match strategy {
        KeepStrategy::First => {}
        KeepStrategy::Oldest => members.sort_by_key(|s| (s.mtime.is_none(), s.mtime)),
        KeepStrategy::Newest => {
            members.sort_by_key(|s| (s.mtime.is_none(), s.mtime.map(std::cmp::Reverse)));
        }
    }

    let mut members = members.into_iter();
    let keep = members.next()?;
    let remove = members.collect();

    log::debug!("Keeping {} ({:?})", keep.path.display(), strategy);
    Some(ActionPlan { keep, remove })
}

/// Plan every group of a scan, skipping groups that cannot be planned.
#[must_use]
pub fn plan_all<'a>(
    groups: impl IntoIterator<Item = &'a DuplicateGroup>,
    strategy: KeepStrategy,
) -> Vec<ActionPlan> {
    groups
        .into_iter()
        .filter_map(|g| plan_group(g, strategy))
        .collect()
}
