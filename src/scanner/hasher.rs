//! Streaming file hasher with in-memory memoization.
//!
//! # Overview
//!
//! [`Hasher`] computes lower-case hexadecimal digests of file contents by
//! reading fixed-size chunks into an incremental digest, so peak memory per
//! call is one chunk regardless of file size.
//!
//! Results are memoized under `(path, size, mtime, algorithm)`, taken from a
//! fresh metadata query on every call. This is a heuristic: a file rewritten
//! with the same size inside the filesystem's mtime granularity yields the
//! stale digest until [`Hasher::clear_cache`] is called.
//!
//! # Example
//!
//! ```no_run
//! use dupehunter::scanner::{HashAlgorithm, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new(8192);
//! let digest = hasher.hash(Path::new("photo.jpg"), HashAlgorithm::Sha256).unwrap();
//! println!("{digest}");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::HashError;

/// Default number of bytes read per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Default prefix length for [`Hasher::partial_hash`] (1 MiB).
pub const PARTIAL_HASH_BYTES: u64 = 1024 * 1024;

/// Supported content digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// MD5 (128-bit, fast, not collision resistant)
    #[default]
    Md5,
    /// SHA-1 (160-bit)
    Sha1,
    /// SHA-256 (256-bit)
    Sha256,
}

impl HashAlgorithm {
    /// Every supported algorithm, in CLI order.
    pub const ALL: [HashAlgorithm; 3] = [Self::Md5, Self::Sha1, Self::Sha256];

    /// Canonical lower-case name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// Length of the hexadecimal digest string.
    #[must_use]
    pub fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when an algorithm name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported hash algorithm: '{0}' (expected md5, sha1 or sha256)")]
pub struct ParseAlgorithmError(pub String);

impl FromStr for HashAlgorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            _ => Err(ParseAlgorithmError(s.to_string())),
        }
    }
}

/// Incremental digest state for one of the supported algorithms.
enum DigestState {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
}

impl DigestState {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => Self::Md5(Md5::new()),
            HashAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Md5(d) => d.update(bytes),
            Self::Sha1(d) => d.update(bytes),
            Self::Sha256(d) => d.update(bytes),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Md5(d) => format!("{:x}", d.finalize()),
            Self::Sha1(d) => format!("{:x}", d.finalize()),
            Self::Sha256(d) => format!("{:x}", d.finalize()),
        }
    }
}

/// Memoization key. `modified` is `None` on platforms without mtime support.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    size: u64,
    modified: Option<SystemTime>,
    algorithm: HashAlgorithm,
}

/// Snapshot of hasher settings and cache occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HasherInfo {
    /// Bytes read per chunk
    pub chunk_size: usize,
    /// Number of memoized digests
    pub cache_entries: usize,
    /// Names of the supported algorithms
    pub supported_algorithms: Vec<&'static str>,
}

/// Chunked file hasher shared by all hashing workers.
///
/// `Hasher` is `Send + Sync`; the cache is the only state mutated by
/// concurrent workers and sits behind a `RwLock`. Two workers racing on the
/// same key both compute the same digest and the last write wins.
#[derive(Debug)]
pub struct Hasher {
    chunk_size: usize,
    cache: RwLock<HashMap<CacheKey, String>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl Hasher {
    /// Create a hasher reading `chunk_size` bytes at a time (minimum 1).
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Bytes read per chunk.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Compute the full-content digest of `path`.
    ///
    /// A fresh metadata query builds the cache key; on a hit the file content
    /// is not touched.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the metadata query fails, the path is a
    /// directory, or the file cannot be opened or read.
    pub fn hash(&self, path: &Path, algorithm: HashAlgorithm) -> Result<String, HashError> {
        let metadata = fs::metadata(path).map_err(|e| HashError::from_io(path, e))?;
        if metadata.is_dir() {
            return Err(HashError::IsDirectory(path.to_path_buf()));
        }

        let key = CacheKey {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().ok(),
            algorithm,
        };

        if let Some(digest) = self.lookup(&key) {
            log::trace!("Hash cache hit: {}", path.display());
            return Ok(digest);
        }

        let digest = self.digest_file(path, algorithm, None)?;
        log::trace!("Hashed {} ({}): {}", path.display(), algorithm, digest);

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, digest.clone());

        Ok(digest)
    }

    /// Compute a digest over at most the first `max_bytes` of `path`.
    ///
    /// Intended as a cheap pre-filter for very large files. Partial digests
    /// are not memoized.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn partial_hash(
        &self,
        path: &Path,
        algorithm: HashAlgorithm,
        max_bytes: u64,
    ) -> Result<String, HashError> {
        self.digest_file(path, algorithm, Some(max_bytes))
    }

    /// Drop every memoized digest.
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of memoized digests.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Settings and cache occupancy.
    #[must_use]
    pub fn info(&self) -> HasherInfo {
        HasherInfo {
            chunk_size: self.chunk_size,
            cache_entries: self.cache_len(),
            supported_algorithms: HashAlgorithm::ALL.iter().map(|a| a.name()).collect(),
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<String> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn digest_file(
        &self,
        path: &Path,
        algorithm: HashAlgorithm,
        limit: Option<u64>,
    ) -> Result<String, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut state = DigestState::new(algorithm);
        let mut buffer = vec![0u8; self.chunk_size];
        let mut remaining = limit;

        loop {
            let want = match remaining {
                Some(0) => break,
                Some(left) => usize::try_from(left).map_or(buffer.len(), |l| l.min(buffer.len())),
                None => buffer.len(),
            };

            let read = match file.read(&mut buffer[..want]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };

            state.update(&buffer[..read]);
            if let Some(left) = remaining.as_mut() {
                *left -= read as u64;
            }
        }

        Ok(state.finalize_hex())
    }
}
