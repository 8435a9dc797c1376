//! Content hashing of size partitions on a bounded worker pool.
//!
//! # Overview
//!
//! Every size partition is one unit of work: a worker hashes the partition's
//! files sequentially, in discovery order, and groups them by digest. Units
//! run concurrently on a rayon pool of `worker_count` threads and send their
//! outcome back over a channel; the calling thread merges outcomes into the
//! final group map and notifies the progress observer, so observer calls never
//! overlap and their `done` counts only grow.
//!
//! Per-file hash failures drop that file from its partition and are reported
//! as warning strings. Cancellation is polled before every file.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use rayon::ThreadPool;

use super::groups::{DuplicateGroup, GroupKey, SizePartitions};
use super::ConfigError;
use crate::progress::ProgressObserver;
use crate::scanner::{CandidateFile, HashAlgorithm, Hasher};

/// Configuration for the resolver stage.
#[derive(Clone)]
pub struct ResolverConfig {
    /// Digest algorithm applied to every file
    pub algorithm: HashAlgorithm,
    /// Number of concurrent hashing workers
    pub worker_count: usize,
    /// Cancellation flag polled before each file
    pub cancel_flag: Option<Arc<AtomicBool>>,
    /// Observer notified after each partition completes
    pub observer: Option<Arc<dyn ProgressObserver>>,
}

impl std::fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverConfig")
            .field("algorithm", &self.algorithm)
            .field("worker_count", &self.worker_count)
            .field("cancel_flag", &self.cancel_flag.is_some())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            worker_count: 4,
            cancel_flag: None,
            observer: None,
        }
    }
}

impl ResolverConfig {
    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the number of hashing workers.
    #[must_use]
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    /// Set the cancellation flag.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// Set the progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Result of the resolver stage.
#[derive(Debug, Clone, Default)]
pub struct ResolveOutcome {
    /// Confirmed duplicate groups keyed by size and digest
    pub groups: BTreeMap<GroupKey, DuplicateGroup>,
    /// Files across all input partitions
    pub files_total: u64,
    /// Files attempted (hashed or failed) before completion or cancellation
    pub files_processed: u64,
    /// Files hashed successfully
    pub hashed_files: u64,
    /// Files whose hash could not be computed
    pub failed_files: u64,
    /// One entry per failed file
    pub warnings: Vec<String>,
    /// Whether cancellation cut the stage short
    pub interrupted: bool,
}

/// What one worker reports back for one partition.
struct UnitOutcome {
    size: u64,
    by_digest: BTreeMap<String, Vec<CandidateFile>>,
    processed: u64,
    failures: Vec<String>,
}

/// Build the bounded hashing pool.
///
/// # Errors
///
/// Returns [`ConfigError::NoWorkers`] for a zero worker count and
/// [`ConfigError::ThreadPool`] if the threads could not be spawned.
pub fn build_pool(worker_count: usize) -> Result<ThreadPool, ConfigError> {
    if worker_count == 0 {
        return Err(ConfigError::NoWorkers);
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .thread_name(|i| format!("dupehunter-hash-{i}"))
        .build()
        .map_err(|e| ConfigError::ThreadPool(e.to_string()))
}

/// Hash every partition and return the duplicate groups.
///
/// Builds a fresh pool of `config.worker_count` threads for this call; use
/// [`resolve_with_pool`] to reuse an existing pool.
///
/// # Errors
///
/// Fails only if the worker pool cannot be built.
///
/// # Example
///
/// ```no_run
/// use dupehunter::duplicates::{partition_by_size, resolve, ResolverConfig};
/// use dupehunter::scanner::{FileFilter, Hasher, Walker};
/// use std::collections::BTreeSet;
/// use std::path::Path;
///
/// let walk = Walker::new(Path::new("."), BTreeSet::new(), FileFilter::default())
///     .walk()
///     .unwrap();
/// let (partitions, _) = partition_by_size(walk.files, None);
/// let outcome = resolve(partitions, &Hasher::default(), &ResolverConfig::default()).unwrap();
/// println!("{} duplicate groups", outcome.groups.len());
/// ```
pub fn resolve(
    partitions: SizePartitions,
    hasher: &Hasher,
    config: &ResolverConfig,
) -> Result<ResolveOutcome, ConfigError> {
    let pool = build_pool(config.worker_count)?;
    Ok(resolve_with_pool(partitions, hasher, config, &pool))
}

/// Hash every partition on `pool` and return the duplicate groups.
///
/// `config.worker_count` is ignored; the pool's size bounds concurrency.
#[must_use]
pub fn resolve_with_pool(
    partitions: SizePartitions,
    hasher: &Hasher,
    config: &ResolverConfig,
    pool: &ThreadPool,
) -> ResolveOutcome {
    let mut outcome = ResolveOutcome {
        files_total: partitions.values().map(|files| files.len() as u64).sum(),
        ..Default::default()
    };

    if partitions.is_empty() {
        log::debug!("Resolver: no size partitions to hash");
        return outcome;
    }

    log::info!(
        "Hashing {} files in {} size partitions with {} workers ({})",
        outcome.files_total,
        partitions.len(),
        pool.current_num_threads(),
        config.algorithm
    );

    let algorithm = config.algorithm;
    let (tx, rx) = mpsc::channel::<UnitOutcome>();

    pool.in_place_scope(|scope| {
        for (size, files) in partitions {
            if config.is_cancelled() {
                break;
            }
            let tx = tx.clone();
            scope.spawn(move |_| {
                let unit = hash_partition(size, files, hasher, algorithm, config);
                // The receiver outlives every unit; a send error cannot happen.
                let _ = tx.send(unit);
            });
        }
        drop(tx);

        for unit in rx {
            merge_unit(&mut outcome, unit);
            if let Some(observer) = &config.observer {
                observer.on_progress(
                    outcome.files_processed,
                    outcome.files_total,
                    &format!(
                        "Processed {}/{} files",
                        outcome.files_processed, outcome.files_total
                    ),
                );
            }
        }
    });

    outcome.interrupted = config.is_cancelled();
    if outcome.interrupted {
        log::info!(
            "Hashing interrupted after {}/{} files",
            outcome.files_processed,
            outcome.files_total
        );
    }

    log::info!(
        "Hashing complete: {} duplicate groups, {} files hashed, {} failed",
        outcome.groups.len(),
        outcome.hashed_files,
        outcome.failed_files
    );

    outcome
}

/// Hash one partition sequentially and group its files by digest.
fn hash_partition(
    size: u64,
    files: Vec<CandidateFile>,
    hasher: &Hasher,
    algorithm: HashAlgorithm,
    config: &ResolverConfig,
) -> UnitOutcome {
    let mut unit = UnitOutcome {
        size,
        by_digest: BTreeMap::new(),
        processed: 0,
        failures: Vec::new(),
    };

    for file in files {
        if config.is_cancelled() {
            log::debug!("Resolver: cancellation requested in {size}-byte partition");
            break;
        }
        unit.processed += 1;

        match hasher.hash(&file.path, algorithm) {
            Ok(digest) => unit.by_digest.entry(digest).or_default().push(file),
            Err(e) => {
                log::warn!("Failed to hash {}: {}", file.path.display(), e);
                unit.failures.push(e.to_string());
            }
        }
    }

    unit
}

fn merge_unit(outcome: &mut ResolveOutcome, unit: UnitOutcome) {
    outcome.files_processed += unit.processed;
    outcome.failed_files += unit.failures.len() as u64;
    outcome.hashed_files += unit.processed - unit.failures.len() as u64;
    outcome.warnings.extend(unit.failures);

    for (digest, files) in unit.by_digest {
        if files.len() < 2 {
            continue;
        }
        log::debug!(
            "Duplicate group {}: {} files, {} bytes each",
            digest,
            files.len(),
            unit.size
        );
        let key = GroupKey::new(unit.size, digest);
        outcome
            .groups
            .insert(key.clone(), DuplicateGroup::from_candidates(key, files));
    }
}
