//! Size partitioning and duplicate group types.
//!
//! # Overview
//!
//! Size partitioning is the first filtering stage of duplicate detection. It
//! groups candidates by their exact size; a file with a unique size cannot
//! have a content duplicate among the scanned set, so singleton sizes are
//! dropped before any file content is read.
//!
//! Zero-byte files are partitioned like any other size: all empty files are
//! byte-identical, so two or more of them form a legitimate duplicate group.
//!
//! # Example
//!
//! ```
//! use dupehunter::scanner::CandidateFile;
//! use dupehunter::duplicates::partition_by_size;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let files = vec![
//!     CandidateFile::new(PathBuf::from("/file1.txt"), 1024, SystemTime::now()),
//!     CandidateFile::new(PathBuf::from("/file2.txt"), 1024, SystemTime::now()),
//!     CandidateFile::new(PathBuf::from("/file3.txt"), 2048, SystemTime::now()),
//! ];
//!
//! let (partitions, stats) = partition_by_size(files, None);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(partitions.len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use crate::scanner::CandidateFile;

/// Candidates grouped by exact byte size, in walker discovery order.
///
/// Only sizes shared by two or more files are present.
pub type SizePartitions = BTreeMap<u64, Vec<CandidateFile>>;

/// Key identifying a duplicate group: the shared size plus the content digest.
///
/// Scoping the digest by size means two partitions can never merge into one
/// group even if a weak algorithm produced the same digest for both.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    /// File size in bytes shared by every member
    pub size: u64,
    /// Lower-case hexadecimal content digest
    pub digest: String,
}

impl GroupKey {
    /// Create a new group key.
    #[must_use]
    pub fn new(size: u64, digest: impl Into<String>) -> Self {
        Self {
            size,
            digest: digest.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.digest, self.size)
    }
}

/// Confirmed group of byte-identical files.
///
/// Members are listed in the order the walker discovered them. A group
/// produced by a scan always has at least two members and no path appears in
/// more than one group of the same scan.
///
/// Groups built by a scan also remember each member's modification time at
/// discovery, so later actions can detect files that changed after hashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Size and digest shared by all members
    pub key: GroupKey,
    /// Member paths in discovery order
    pub files: Vec<PathBuf>,
    /// Modification time of each member when it was discovered
    #[serde(default)]
    pub scanned_mtimes: BTreeMap<PathBuf, SystemTime>,
}

impl DuplicateGroup {
    /// Create a new duplicate group with no recorded discovery times.
    #[must_use]
    pub fn new(key: GroupKey, files: Vec<PathBuf>) -> Self {
        Self {
            key,
            files,
            scanned_mtimes: BTreeMap::new(),
        }
    }

    /// Create a group from hashed candidates, keeping their discovery times.
    ///
    /// A modification time of `UNIX_EPOCH` means the walker could not read it
    /// and is not recorded.
    #[must_use]
    pub fn from_candidates(key: GroupKey, candidates: Vec<CandidateFile>) -> Self {
        let mut scanned_mtimes = BTreeMap::new();
        let files = candidates
            .into_iter()
            .map(|c| {
                if c.modified != SystemTime::UNIX_EPOCH {
                    scanned_mtimes.insert(c.path.clone(), c.modified);
                }
                c.path
            })
            .collect();
        Self {
            key,
            files,
            scanned_mtimes,
        }
    }

    /// Modification time of `path` when the scan discovered it, if known.
    #[must_use]
    pub fn scanned_modified(&self, path: &Path) -> Option<SystemTime> {
        self.scanned_mtimes.get(path).copied()
    }

    /// Size in bytes of each member.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.key.size
    }

    /// Content digest shared by all members.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.key.digest
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.key.size * self.files.len() as u64
    }

    /// Total wasted space (all copies minus one).
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.key.size * self.duplicate_count() as u64
    }

    /// Number of duplicate copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Check whether `path` is a member of this group.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|p| p == path)
    }
}

/// Statistics from the size partitioning stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionStats {
    /// Total number of candidates consumed
    pub total_files: usize,
    /// Total size of all consumed candidates in bytes
    pub total_size: u64,
    /// Number of distinct sizes seen
    pub unique_sizes: usize,
    /// Number of files in partitions of 2+ (potential duplicates)
    pub potential_duplicates: usize,
    /// Number of files eliminated because their size was unique
    pub eliminated_unique: usize,
    /// Number of zero-byte files seen
    pub empty_files: usize,
    /// Number of surviving partitions
    pub partitions: usize,
    /// Whether partitioning stopped early because of cancellation
    pub interrupted: bool,
}

impl PartitionStats {
    /// Percentage of files eliminated by size partitioning.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group candidates by exact size, keeping only sizes shared by 2+ files.
///
/// Within each partition files keep their input order. When `cancel` is set
/// the remaining input is left unconsumed and the partitions built so far are
/// returned; files whose partner was never reached get dropped as singletons.
///
/// # Example
///
/// ```
/// use dupehunter::scanner::CandidateFile;
/// use dupehunter::duplicates::partition_by_size;
/// use std::path::PathBuf;
/// use std::time::SystemTime;
///
/// let files = vec![
///     CandidateFile::new(PathBuf::from("/a.txt"), 100, SystemTime::now()),
///     CandidateFile::new(PathBuf::from("/b.txt"), 100, SystemTime::now()),
///     CandidateFile::new(PathBuf::from("/c.txt"), 200, SystemTime::now()),
/// ];
///
/// let (partitions, stats) = partition_by_size(files, None);
///
/// assert_eq!(partitions.len(), 1);
/// assert_eq!(partitions[&100].len(), 2);
/// assert_eq!(stats.eliminated_unique, 1);
/// ```
#[must_use]
pub fn partition_by_size(
    candidates: impl IntoIterator<Item = CandidateFile>,
    cancel: Option<&AtomicBool>,
) -> (SizePartitions, PartitionStats) {
    let mut all: BTreeMap<u64, Vec<CandidateFile>> = BTreeMap::new();
    let mut stats = PartitionStats::default();

    for file in candidates {
        if cancel.is_some_and(|f| f.load(Ordering::SeqCst)) {
            log::debug!("Partitioner: cancellation requested, stopping early");
            stats.interrupted = true;
            break;
        }

        stats.total_files += 1;
        stats.total_size += file.size;
        if file.size == 0 {
            stats.empty_files += 1;
        }

        all.entry(file.size).or_default().push(file);
    }

    stats.unique_sizes = all.len();

    let partitions: SizePartitions = all
        .into_iter()
        .filter(|(size, files)| {
            if files.len() < 2 {
                stats.eliminated_unique += files.len();
                log::trace!("Eliminated unique size {}: {}", size, files[0].path.display());
                false
            } else {
                stats.potential_duplicates += files.len();
                stats.partitions += 1;
                log::debug!("Size partition {} bytes: {} files", size, files.len());
                true
            }
        })
        .collect();

    log::info!(
        "Size partitioning complete: {} files -> {} potential duplicates ({:.1}% eliminated)",
        stats.total_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (partitions, stats)
}
