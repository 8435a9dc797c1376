//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based partitioning of candidate files
//! - Parallel content hashing of size partitions
//! - Scan orchestration with cancellation and progress reporting

pub mod finder;
pub mod groups;
pub mod resolver;

pub use finder::{
    scan, ConfigError, DuplicateFinder, FinderError, ScanConfig, ScanResult, ScanState,
    ScanStatus, DEFAULT_EXCLUDED_DIRS, DEFAULT_MIN_SIZE, DEFAULT_WORKER_COUNT,
};
pub use groups::{partition_by_size, DuplicateGroup, GroupKey, PartitionStats, SizePartitions};
pub use resolver::{build_pool, resolve, resolve_with_pool, ResolveOutcome, ResolverConfig};
