//! Scan orchestration.
//!
//! # Overview
//!
//! [`DuplicateFinder`] owns a validated [`ScanConfig`], a shared [`Hasher`]
//! and a worker pool, and sequences the pipeline:
//!
//! 1. **Walk** - collect candidate files from the root directory
//! 2. **Partition** - group candidates by exact size, dropping unique sizes
//! 3. **Resolve** - hash each partition on the worker pool and group by digest
//!
//! Walking and partitioning run on the calling thread; only hashing fans out.
//!
//! # State machine
//!
//! A finder starts [`ScanState::Idle`]. [`DuplicateFinder::scan`] moves it to
//! [`ScanState::Running`] and, when the call returns, to the terminal state
//! matching [`ScanResult::status`]. A later call starts a fresh run. Only one
//! scan may run per finder at a time; a concurrent call fails with
//! [`FinderError::Busy`].
//!
//! # Example
//!
//! ```no_run
//! use dupehunter::duplicates::{DuplicateFinder, ScanConfig};
//! use std::path::Path;
//!
//! let config = ScanConfig::default().with_min_size(1).with_worker_count(8);
//! let finder = DuplicateFinder::new(config).unwrap();
//!
//! let result = finder.scan(Path::new("/some/path")).unwrap();
//! println!("Found {} duplicate groups", result.group_count());
//! println!("Reclaimable space: {} bytes", result.reclaimable_bytes());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

use super::groups::{partition_by_size, DuplicateGroup, GroupKey};
use super::resolver::{build_pool, resolve_with_pool, ResolverConfig};
use crate::progress::ProgressObserver;
use crate::scanner::{FileFilter, HashAlgorithm, Hasher, Walker, DEFAULT_CHUNK_SIZE};

/// Directory names skipped at every depth unless configured otherwise.
pub const DEFAULT_EXCLUDED_DIRS: [&str; 5] =
    [".git", "node_modules", "__pycache__", ".vscode", ".idea"];

/// Default minimum file size in bytes.
pub const DEFAULT_MIN_SIZE: u64 = 1024;

/// Default number of hashing workers.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Errors raised for an invalid [`ScanConfig`], before any I/O.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The algorithm name is not one of md5, sha1, sha256.
    #[error("Unsupported hash algorithm: {0} (expected one of: md5, sha1, sha256)")]
    UnsupportedAlgorithm(String),

    /// The size bounds are inverted.
    #[error("Maximum size ({max} bytes) is below minimum size ({min} bytes)")]
    MaxBelowMin {
        /// Configured minimum
        min: u64,
        /// Configured maximum
        max: u64,
    },

    /// Zero hashing workers were requested.
    #[error("Worker count must be at least 1")]
    NoWorkers,

    /// A zero-byte read chunk was requested.
    #[error("Read chunk size must be at least 1 byte")]
    ZeroChunkSize,

    /// The hashing worker pool could not be started.
    #[error("Failed to start hashing workers: {0}")]
    ThreadPool(String),
}

/// Errors returned synchronously by [`DuplicateFinder::scan`].
///
/// Everything else that goes wrong during a scan is recorded in
/// [`ScanResult::errors`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FinderError {
    /// Another scan is already running on this finder.
    #[error("A scan is already running")]
    Busy,

    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Immutable scan configuration.
///
/// Built with `with_*` methods and checked by [`ScanConfig::validate`] when a
/// [`DuplicateFinder`] is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Digest algorithm
    pub algorithm: HashAlgorithm,
    /// Smallest file size included (inclusive)
    pub min_size: u64,
    /// Largest file size included (inclusive)
    pub max_size: Option<u64>,
    /// Extension allow-list (lower-case, dot-prefixed); `None` allows all
    pub allowed_extensions: Option<BTreeSet<String>>,
    /// Directory names pruned at every depth
    pub excluded_dir_names: BTreeSet<String>,
    /// Number of concurrent hashing workers
    pub worker_count: usize,
    /// Bytes read per chunk when hashing
    pub read_chunk_bytes: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            min_size: DEFAULT_MIN_SIZE,
            max_size: None,
            allowed_extensions: None,
            excluded_dir_names: DEFAULT_EXCLUDED_DIRS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            worker_count: DEFAULT_WORKER_COUNT,
            read_chunk_bytes: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ScanConfig {
    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the digest algorithm by name (`md5`, `sha1`, `sha256`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedAlgorithm`] for any other name.
    pub fn with_algorithm_name(mut self, name: &str) -> Result<Self, ConfigError> {
        self.algorithm = name
            .parse()
            .map_err(|_| ConfigError::UnsupportedAlgorithm(name.to_string()))?;
        Ok(self)
    }

    /// Set the minimum file size.
    #[must_use]
    pub fn with_min_size(mut self, bytes: u64) -> Self {
        self.min_size = bytes;
        self
    }

    /// Set the maximum file size.
    #[must_use]
    pub fn with_max_size(mut self, bytes: Option<u64>) -> Self {
        self.max_size = bytes;
        self
    }

    /// Restrict scanning to these extensions. Dots and case are normalized.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = extensions
            .into_iter()
            .map(|e| FileFilter::normalize_extension(e.as_ref()))
            .filter(|e| e.len() > 1)
            .collect();
        self.allowed_extensions = Some(set);
        self
    }

    /// Replace the excluded directory names.
    #[must_use]
    pub fn with_excluded_dirs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_dir_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the number of hashing workers.
    #[must_use]
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    /// Set the read chunk size for hashing.
    #[must_use]
    pub fn with_read_chunk_bytes(mut self, bytes: usize) -> Self {
        self.read_chunk_bytes = bytes;
        self
    }

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(max) = self.max_size {
            if max < self.min_size {
                return Err(ConfigError::MaxBelowMin {
                    min: self.min_size,
                    max,
                });
            }
        }
        if self.worker_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.read_chunk_bytes == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(())
    }

    /// Build the candidate filter for this configuration.
    #[must_use]
    pub fn file_filter(&self) -> FileFilter {
        FileFilter::new(
            self.min_size,
            self.max_size,
            self.allowed_extensions.clone(),
        )
    }
}

/// Lifecycle state of a [`DuplicateFinder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    /// No scan has run yet
    Idle,
    /// A scan is in progress
    Running,
    /// The last scan ran to completion
    Completed,
    /// The last scan was cancelled
    Cancelled,
    /// The last scan could not run (missing root, worker failure)
    Failed,
}

impl ScanState {
    /// Whether this state ends a scan.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Every stage ran to completion
    Completed,
    /// Cancellation cut the scan short; the result holds partial data
    Cancelled,
    /// The scan could not run; see [`ScanResult::errors`]
    Failed,
}

impl From<ScanStatus> for ScanState {
    fn from(status: ScanStatus) -> Self {
        match status {
            ScanStatus::Completed => Self::Completed,
            ScanStatus::Cancelled => Self::Cancelled,
            ScanStatus::Failed => Self::Failed,
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&ScanState::from(*self), f)
    }
}

/// Outcome of one scan, owned by the caller.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Directory that was scanned
    pub root: PathBuf,
    /// Digest algorithm used
    pub algorithm: HashAlgorithm,
    /// How the scan ended
    pub status: ScanStatus,
    /// Number of files that passed the filter
    pub total_files: u64,
    /// Combined size of those files
    pub total_size_bytes: u64,
    /// Duplicate groups keyed by size and digest
    pub duplicate_groups: BTreeMap<GroupKey, DuplicateGroup>,
    /// Wall-clock duration of the scan
    pub elapsed: Duration,
    /// Non-fatal failures, in the order they were recorded
    pub errors: Vec<String>,
}

impl ScanResult {
    fn empty(root: &Path, algorithm: HashAlgorithm, status: ScanStatus) -> Self {
        Self {
            root: root.to_path_buf(),
            algorithm,
            status,
            total_files: 0,
            total_size_bytes: 0,
            duplicate_groups: BTreeMap::new(),
            elapsed: Duration::ZERO,
            errors: Vec::new(),
        }
    }

    /// Number of duplicate groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.duplicate_groups.len()
    }

    /// Number of redundant copies (every group's members minus one).
    #[must_use]
    pub fn duplicate_file_count(&self) -> usize {
        self.duplicate_groups
            .values()
            .map(DuplicateGroup::duplicate_count)
            .sum()
    }

    /// Bytes freed by keeping one copy per group.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.duplicate_groups
            .values()
            .map(DuplicateGroup::wasted_space)
            .sum()
    }

    /// Whether the scan was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == ScanStatus::Cancelled
    }

    /// Whether the scan could not run.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == ScanStatus::Failed
    }

    /// Groups ordered by reclaimable space, largest first.
    #[must_use]
    pub fn groups_by_wasted_space(&self) -> Vec<&DuplicateGroup> {
        let mut groups: Vec<&DuplicateGroup> = self.duplicate_groups.values().collect();
        groups.sort_by(|a, b| {
            b.wasted_space()
                .cmp(&a.wasted_space())
                .then_with(|| a.key.cmp(&b.key))
        });
        groups
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Duplicate finder that runs the walk, partition and resolve pipeline.
pub struct DuplicateFinder {
    config: ScanConfig,
    hasher: Arc<Hasher>,
    pool: ThreadPool,
    observer: Mutex<Option<Arc<dyn ProgressObserver>>>,
    state: Mutex<ScanState>,
    active_cancel: Mutex<Option<Arc<AtomicBool>>>,
}

impl fmt::Debug for DuplicateFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuplicateFinder")
            .field("config", &self.config)
            .field("hasher", &self.hasher)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Moves the finder out of `Running` when a scan returns, even on panic.
struct RunGuard<'a> {
    finder: &'a DuplicateFinder,
    terminal: ScanState,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.finder.active_cancel) = None;
        *lock(&self.finder.state) = self.terminal;
    }
}

impl DuplicateFinder {
    /// Create a finder with its own hasher.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid or the worker
    /// pool cannot be started.
    pub fn new(config: ScanConfig) -> Result<Self, ConfigError> {
        let hasher = Arc::new(Hasher::new(config.read_chunk_bytes));
        Self::with_hasher(config, hasher)
    }

    /// Create a finder sharing an existing hasher and its cache.
    ///
    /// The hasher's chunk size takes precedence over `read_chunk_bytes`.
    ///
    /// # Errors
    ///
    /// Same as [`DuplicateFinder::new`].
    pub fn with_hasher(config: ScanConfig, hasher: Arc<Hasher>) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = build_pool(config.worker_count)?;
        Ok(Self {
            config,
            hasher,
            pool,
            observer: Mutex::new(None),
            state: Mutex::new(ScanState::Idle),
            active_cancel: Mutex::new(None),
        })
    }

    /// The configuration this finder was built with.
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// The hasher used by this finder.
    #[must_use]
    pub fn hasher(&self) -> &Arc<Hasher> {
        &self.hasher
    }

    /// Register the observer for subsequent scans, replacing any previous one.
    pub fn set_progress_observer(&self, observer: Arc<dyn ProgressObserver>) {
        *lock(&self.observer) = Some(observer);
    }

    /// Remove the progress observer.
    pub fn clear_progress_observer(&self) {
        *lock(&self.observer) = None;
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ScanState {
        *lock(&self.state)
    }

    /// Whether a scan is in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ScanState::Running
    }

    /// Request cancellation of the running scan.
    ///
    /// Idempotent. Does nothing when no scan is running.
    pub fn cancel(&self) {
        if let Some(flag) = lock(&self.active_cancel).as_ref() {
            log::info!("Scan cancellation requested");
            flag.store(true, Ordering::SeqCst);
        }
    }

    /// Scan `directory` for duplicate files.
    ///
    /// A missing root or a root that is not a directory is not an error of
    /// this call: the result has status [`ScanStatus::Failed`] and the reason
    /// in [`ScanResult::errors`]. Cancellation returns the partial result
    /// with status [`ScanStatus::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Busy`] if a scan is already running on this
    /// finder.
    pub fn scan(&self, directory: &Path) -> Result<ScanResult, FinderError> {
        let cancel = Arc::new(AtomicBool::new(false));
        {
            let mut state = lock(&self.state);
            if *state == ScanState::Running {
                log::warn!("Rejected scan of {}: finder is busy", directory.display());
                return Err(FinderError::Busy);
            }
            *state = ScanState::Running;
            *lock(&self.active_cancel) = Some(Arc::clone(&cancel));
        }

        let mut guard = RunGuard {
            finder: self,
            terminal: ScanState::Failed,
        };
        let result = self.run(directory, &cancel);
        guard.terminal = result.status.into();
        Ok(result)
    }

    fn run(&self, directory: &Path, cancel: &Arc<AtomicBool>) -> ScanResult {
        let start = Instant::now();
        let observer = lock(&self.observer).clone();
        let notify_stage = |stage: &str| {
            if let Some(observer) = &observer {
                observer.on_stage(stage);
            }
        };

        log::info!(
            "Scanning {} ({}, min size {} bytes, {} workers)",
            directory.display(),
            self.config.algorithm,
            self.config.min_size,
            self.config.worker_count
        );

        notify_stage("walking");
        let walker = Walker::new(
            directory,
            self.config.excluded_dir_names.clone(),
            self.config.file_filter(),
        )
        .with_cancel_flag(Arc::clone(cancel));

        let walk = match walker.walk() {
            Ok(walk) => walk,
            Err(e) => {
                log::error!("Scan failed: {}", e);
                notify_stage("done");
                let mut result =
                    ScanResult::empty(directory, self.config.algorithm, ScanStatus::Failed);
                result.errors.push(e.to_string());
                result.elapsed = start.elapsed();
                return result;
            }
        };

        let mut result = ScanResult::empty(directory, self.config.algorithm, ScanStatus::Completed);
        result.total_files = walk.files.len() as u64;
        result.total_size_bytes = walk.total_size();
        if walk.skipped > 0 {
            result.errors.push(format!(
                "{} entries under {} could not be read and were skipped",
                walk.skipped,
                directory.display()
            ));
        }

        notify_stage("partitioning");
        let (partitions, _) = partition_by_size(walk.files, Some(cancel.as_ref()));

        notify_stage("hashing");
        let mut resolver_config = ResolverConfig::default()
            .with_algorithm(self.config.algorithm)
            .with_worker_count(self.config.worker_count)
            .with_cancel_flag(Arc::clone(cancel));
        if let Some(observer) = &observer {
            resolver_config = resolver_config.with_observer(Arc::clone(observer));
        }
        let resolved = resolve_with_pool(partitions, &self.hasher, &resolver_config, &self.pool);

        result.duplicate_groups = resolved.groups;
        result.errors.extend(resolved.warnings);
        if cancel.load(Ordering::SeqCst) {
            result.status = ScanStatus::Cancelled;
        }
        result.elapsed = start.elapsed();
        notify_stage("done");

        log::info!(
            "Scan {}: {} files, {} duplicate groups, {} bytes reclaimable in {:.2?}",
            result.status,
            result.total_files,
            result.group_count(),
            result.reclaimable_bytes(),
            result.elapsed
        );

        result
    }
}

/// Scan `directory` with a one-off finder.
///
/// # Errors
///
/// Returns [`FinderError::Config`] if `config` is invalid.
pub fn scan(directory: &Path, config: ScanConfig) -> Result<ScanResult, FinderError> {
    DuplicateFinder::new(config)?.scan(directory)
}
