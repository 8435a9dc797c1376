//! Directory walker implementation using jwalk.
//!
//! # Overview
//!
//! [`Walker`] traverses a directory tree and collects the regular files that
//! pass a [`FileFilter`] as [`CandidateFile`] entries.
//!
//! # Behavior
//!
//! - Subdirectories whose *name* is in the excluded set are pruned before
//!   descending, at every depth (any `.git` anywhere in the tree).
//! - Symbolic links are not followed and are never candidates.
//! - Per-entry I/O failures (permission denied, vanished entries) skip the
//!   entry; they are counted in [`WalkOutcome::skipped`] but never fail the walk.
//! - The cancellation flag is polled per entry; a cancelled walk returns what
//!   it has collected so far.
//!
//! # Example
//!
//! ```no_run
//! use dupehunter::scanner::{FileFilter, Walker};
//! use std::collections::BTreeSet;
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), BTreeSet::new(), FileFilter::default());
//! let outcome = walker.walk().unwrap();
//! println!("Found {} candidate files", outcome.files.len());
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use jwalk::{Parallelism, WalkDir};

use super::{CandidateFile, FileFilter, ScanError};

/// Result of a directory walk.
#[derive(Debug, Clone, Default)]
pub struct WalkOutcome {
    /// Accepted files in discovery order
    pub files: Vec<CandidateFile>,
    /// Entries that could not be read and were skipped
    pub skipped: usize,
    /// Whether the walk stopped early because of cancellation
    pub interrupted: bool,
}

impl WalkOutcome {
    /// Sum of the sizes of all accepted files.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Directory walker producing filtered candidate files.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Directory names pruned at any depth
    excluded_dir_names: Arc<BTreeSet<String>>,
    /// Inclusion predicate for regular files
    filter: FileFilter,
    /// Optional cancellation flag
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(root: &Path, excluded_dir_names: BTreeSet<String>, filter: FileFilter) -> Self {
        Self {
            root: root.to_path_buf(),
            excluded_dir_names: Arc::new(excluded_dir_names),
            filter,
            cancel_flag: None,
        }
    }

    /// Set the cancellation flag.
    ///
    /// When the flag becomes `true` the walk stops at the next entry and
    /// returns the files collected so far.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk the tree and collect candidate files.
    ///
    /// Traversal runs on the calling thread; children are sorted by name so
    /// discovery order is stable for an unchanged tree.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotFound`] if the root does not exist and
    /// [`ScanError::NotADirectory`] if it is not a directory.
    pub fn walk(&self) -> Result<WalkOutcome, ScanError> {
        if !self.root.exists() {
            return Err(ScanError::NotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }

        let excluded = Arc::clone(&self.excluded_dir_names);
        let walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .skip_hidden(false)
            .sort(true)
            .parallelism(Parallelism::Serial)
            .process_read_dir(move |_depth, _path, _read_dir_state, children| {
                children.retain(|child| match child {
                    Ok(entry) => {
                        let pruned = entry.file_type().is_dir()
                            && excluded.contains(entry.file_name().to_string_lossy().as_ref());
                        if pruned {
                            log::trace!("Excluding directory: {}", entry.path().display());
                        }
                        !pruned
                    }
                    Err(_) => true,
                });
            });

        let mut outcome = WalkOutcome::default();

        for entry_result in walk_dir {
            if self.is_cancelled() {
                log::debug!("Walker: cancellation requested, stopping traversal");
                outcome.interrupted = true;
                break;
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    log::debug!("Skipping unreadable entry: {}", e);
                    outcome.skipped += 1;
                    continue;
                }
            };

            if entry.depth == 0 {
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            let path = entry.path();
            if file_type.is_symlink() {
                log::trace!("Skipping symlink: {}", path.display());
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    log::debug!("Skipping {}: {}", path.display(), e);
                    outcome.skipped += 1;
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let size = metadata.len();
            if !self.filter.include(&path, size) {
                log::trace!("Filtered out ({} bytes): {}", size, path.display());
                continue;
            }

            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            outcome.files.push(CandidateFile::new(path, size, modified));
        }

        log::info!(
            "Walk of {} complete: {} candidate files, {} entries skipped",
            self.root.display(),
            outcome.files.len(),
            outcome.skipped
        );

        Ok(outcome)
    }
}
