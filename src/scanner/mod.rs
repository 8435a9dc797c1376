//! Scanner module for directory traversal, candidate filtering and hashing.
//!
//! This module provides functionality for:
//! - Directory walking using jwalk with name-based directory exclusion
//! - Candidate filtering by size bounds and extension allow-list
//! - Streaming content digests (MD5, SHA-1, SHA-256) with memoization
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and candidate discovery
//! - [`filter`]: Stateless inclusion predicate
//! - [`hasher`]: Chunked file hashing with an in-memory cache
//!
//! # Example
//!
//! ```no_run
//! use dupehunter::scanner::{FileFilter, Walker};
//! use std::collections::BTreeSet;
//! use std::path::Path;
//!
//! let filter = FileFilter::new(1024, None, None);
//! let excluded: BTreeSet<String> = [".git".to_string()].into();
//! let walker = Walker::new(Path::new("."), excluded, filter);
//!
//! let outcome = walker.walk().unwrap();
//! for file in &outcome.files {
//!     println!("{}: {} bytes", file.path.display(), file.size);
//! }
//! ```

pub mod filter;
pub mod hasher;
pub mod walker;

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

// Re-export main types
pub use filter::FileFilter;
pub use hasher::{
    HashAlgorithm, Hasher, HasherInfo, ParseAlgorithmError, DEFAULT_CHUNK_SIZE, PARTIAL_HASH_BYTES,
};
pub use walker::{WalkOutcome, Walker};

/// A file discovered by the walker that passed the filter.
///
/// Captures size and modification time at discovery; the file may change
/// afterwards and later stages treat that as a per-file error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Path as produced by the walker (rooted at the scan directory)
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

impl CandidateFile {
    /// Create a new candidate.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            modified,
        }
    }
}

/// Errors that can end a directory walk before it starts.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The scan root does not exist.
    #[error("Directory not found: {0}")]
    NotFound(PathBuf),

    /// The scan root exists but is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Errors that can occur while hashing a single file.
///
/// These are always recoverable: the file is dropped from its group and the
/// error is recorded as a warning on the scan result.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file disappeared since it was discovered.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path turned into a directory since it was discovered.
    #[error("Is a directory: {0}")]
    IsDirectory(PathBuf),

    /// Any other I/O failure while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
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

    /// The path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::IsDirectory(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}
