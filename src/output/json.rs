//! JSON output formatter for duplicate scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2026-01-01T12:00:00+00:00",
//!   "root": "/data",
//!   "algorithm": "md5",
//!   "status": "completed",
//!   "summary": {
//!     "total_files": 100,
//!     "total_size": 1048576,
//!     "duplicate_groups": 5,
//!     "duplicate_files": 10,
//!     "reclaimable_space": 51200,
//!     "scan_duration_ms": 1234,
//!     "interrupted": false
//!   },
//!   "duplicates": [
//!     {
//!       "hash": "d41d8cd98f00b204e9800998ecf8427e",
//!       "size": 1024,
//!       "files": ["/data/a.txt", "/data/b.txt"]
//!     }
//!   ],
//!   "errors": []
//! }
//! ```
//!
//! Groups are listed largest wasted space first.

use std::io::Write;

use chrono::Utc;
use serde::Serialize;

use crate::duplicates::{DuplicateGroup, ScanResult};

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Content digest as lower-case hex
    pub hash: String,
    /// File size in bytes
    pub size: u64,
    /// Paths to all duplicate files, in discovery order
    pub files: Vec<String>,
}

impl From<&DuplicateGroup> for JsonDuplicateGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            hash: group.digest().to_string(),
            size: group.size(),
            files: group
                .files
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Total number of files scanned
    pub total_files: u64,
    /// Total size of all scanned files in bytes
    pub total_size: u64,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding one original per group)
    pub duplicate_files: usize,
    /// Space that can be reclaimed by removing duplicates (bytes)
    pub reclaimable_space: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Whether the scan was cancelled
    pub interrupted: bool,
}

impl From<&ScanResult> for JsonSummary {
    fn from(result: &ScanResult) -> Self {
        Self {
            total_files: result.total_files,
            total_size: result.total_size_bytes,
            duplicate_groups: result.group_count(),
            duplicate_files: result.duplicate_file_count(),
            reclaimable_space: result.reclaimable_bytes(),
            scan_duration_ms: u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX),
            interrupted: result.is_cancelled(),
        }
    }
}

/// The complete JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// When the report was produced (RFC 3339)
    pub generated_at: String,
    /// Scanned directory
    pub root: String,
    /// Digest algorithm used
    pub algorithm: String,
    /// Final scan status
    pub status: String,
    /// Aggregate statistics
    pub summary: JsonSummary,
    /// Duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Non-fatal errors collected during the scan
    pub errors: Vec<String>,
}

impl JsonOutput {
    /// Build the JSON document for `result`.
    #[must_use]
    pub fn new(result: &ScanResult) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            root: result.root.to_string_lossy().into_owned(),
            algorithm: result.algorithm.to_string(),
            status: result.status.to_string(),
            summary: JsonSummary::from(result),
            duplicates: result
                .groups_by_wasted_space()
                .into_iter()
                .map(JsonDuplicateGroup::from)
                .collect(),
            errors: result.errors.clone(),
        }
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: W, pretty: bool) -> serde_json::Result<()> {
        if pretty {
            serde_json::to_writer_pretty(writer, self)
        } else {
            serde_json::to_writer(writer, self)
        }
    }
}
