//! HTML output formatter for duplicate scan results.
//!
//! Produces a self-contained report (CSS embedded, dark mode through a media
//! query) from the `templates/report.html` askama template. File paths and
//! error strings are escaped by the template engine.
//!
//! ```no_run
//! use dupehunter::duplicates::{scan, ScanConfig};
//! use dupehunter::output::html::HtmlOutput;
//! use std::path::Path;
//!
//! let result = scan(Path::new("/data"), ScanConfig::default()).unwrap();
//! std::fs::write("report.html", HtmlOutput::new(&result).to_html().unwrap()).unwrap();
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime};

use askama::Template;
use bytesize::ByteSize;
use chrono::{DateTime, Local};

use crate::duplicates::{DuplicateGroup, ScanResult};

/// Complete HTML document for the askama template.
#[derive(Template)]
#[template(path = "report.html")]
pub struct HtmlOutput {
    /// Formatted generation timestamp
    pub timestamp: String,
    /// Application version
    pub version: String,
    /// Scanned directory
    pub root: String,
    /// Digest algorithm used
    pub algorithm: String,
    /// Final scan status
    pub status: String,
    /// Whether the scan was cancelled
    pub cancelled: bool,
    /// Number of files scanned
    pub total_files: u64,
    /// Human-readable total size
    pub total_size: String,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Number of redundant copies
    pub duplicate_files: usize,
    /// Human-readable reclaimable space
    pub reclaimable_space: String,
    /// Human-readable scan duration
    pub elapsed: String,
    /// Groups, largest wasted space first
    pub groups: Vec<HtmlDuplicateGroup>,
    /// Non-fatal errors collected during the scan
    pub errors: Vec<String>,
}

/// A duplicate group formatted for HTML presentation.
pub struct HtmlDuplicateGroup {
    /// Content digest as lower-case hex
    pub digest: String,
    /// Human-readable size shared by all files
    pub size_formatted: String,
    /// Human-readable space taken by the redundant copies
    pub wasted_formatted: String,
    /// Member files in discovery order
    pub files: Vec<HtmlFileEntry>,
}

/// A file entry formatted for HTML presentation.
pub struct HtmlFileEntry {
    /// Path display string
    pub path_display: String,
    /// Formatted modification time, or "unknown"
    pub modified_formatted: String,
}

impl From<&DuplicateGroup> for HtmlDuplicateGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            digest: group.digest().to_string(),
            size_formatted: ByteSize::b(group.size()).to_string(),
            wasted_formatted: ByteSize::b(group.wasted_space()).to_string(),
            files: group
                .files
                .iter()
                .map(|path| HtmlFileEntry {
                    path_display: path.to_string_lossy().into_owned(),
                    modified_formatted: modified_time(group, path),
                })
                .collect(),
        }
    }
}

impl HtmlOutput {
    /// Build the report for `result`.
    #[must_use]
    pub fn new(result: &ScanResult) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            root: result.root.to_string_lossy().into_owned(),
            algorithm: result.algorithm.to_string(),
            status: result.status.to_string(),
            cancelled: result.is_cancelled(),
            total_files: result.total_files,
            total_size: ByteSize::b(result.total_size_bytes).to_string(),
            duplicate_groups: result.group_count(),
            duplicate_files: result.duplicate_file_count(),
            reclaimable_space: ByteSize::b(result.reclaimable_bytes()).to_string(),
            elapsed: format_duration(result.elapsed),
            groups: result
                .groups_by_wasted_space()
                .into_iter()
                .map(HtmlDuplicateGroup::from)
                .collect(),
            errors: result.errors.clone(),
        }
    }

    /// Render the HTML document.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn to_html(&self) -> Result<String, askama::Error> {
        self.render()
    }

    /// Write the HTML document to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), HtmlOutputError> {
        let html = self.to_html()?;
        writer.write_all(html.as_bytes())?;
        Ok(())
    }
}

/// Discovery time if the scan recorded one, else the current metadata.
fn modified_time(group: &DuplicateGroup, path: &Path) -> String {
    group
        .scanned_modified(path)
        .or_else(|| fs::metadata(path).and_then(|m| m.modified()).ok())
        .map_or_else(|| "unknown".to_string(), format_time)
}

fn format_time(time: SystemTime) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, duration.subsec_millis())
    } else {
        format!("{}ms", duration.subsec_millis())
    }
}

/// Errors that can occur during HTML output generation.
#[derive(thiserror::Error, Debug)]
pub enum HtmlOutputError {
    /// Template rendering error
    #[error("HTML template error: {0}")]
    Template(#[from] askama::Error),

    /// I/O error during writing
    #[error("I/O error during HTML generation: {0}")]
    Io(#[from] std::io::Error),
}
