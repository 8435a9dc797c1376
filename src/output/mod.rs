//! Output formatters for duplicate scan results.
//!
//! This module renders a finished [`ScanResult`] in different formats:
//! - Text for people reading a terminal
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//! - HTML for a self-contained, shareable report
//!
//! Every formatter treats the result as read-only input.
//!
//! # Example
//!
//! ```no_run
//! use dupehunter::duplicates::{scan, ScanConfig};
//! use dupehunter::output::json::JsonOutput;
//! use std::path::Path;
//!
//! let result = scan(Path::new("."), ScanConfig::default()).unwrap();
//!
//! let output = JsonOutput::new(&result);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod html;
pub mod json;
pub mod text;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::duplicates::ScanResult;

// Re-export main types
pub use csv::{CsvOutput, CsvOutputError};
pub use html::{HtmlOutput, HtmlOutputError};
pub use json::JsonOutput;
pub use text::TextOutput;

/// Report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary and group listing
    #[default]
    Text,
    /// JSON document
    Json,
    /// One CSV row per duplicate file
    Csv,
    /// Self-contained HTML report
    Html,
}

impl OutputFormat {
    /// Whether this format is meant for other programs rather than people.
    #[must_use]
    pub fn is_machine_readable(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Render `result` as `format` into `writer`.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_report<W: Write>(
    result: &ScanResult,
    format: OutputFormat,
    mut writer: W,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => TextOutput::new(result).write_to(&mut writer)?,
        OutputFormat::Json => {
            JsonOutput::new(result).write_to(&mut writer, true)?;
            writeln!(writer)?;
        }
        OutputFormat::Csv => CsvOutput::new(result).write_to(&mut writer)?,
        OutputFormat::Html => HtmlOutput::new(result).write_to(&mut writer)?,
    }
    writer.flush()?;
    Ok(())
}

/// Render `result` to `output_file`, or to stdout when `None`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or writing fails.
pub fn emit_report(
    result: &ScanResult,
    format: OutputFormat,
    output_file: Option<&Path>,
) -> anyhow::Result<()> {
    match output_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            write_report(result, format, BufWriter::new(file))?;
            log::info!("Report written to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            write_report(result, format, stdout.lock())?;
        }
    }
    Ok(())
}
