//! Command-line interface definitions for DupeHunter.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Scan flags are optional overrides layered on top of the loaded configuration.
//!
//! # Example
//!
//! ```bash
//! # Scan a directory with a text report
//! dupehunter scan ~/Downloads
//!
//! # JSON report written to a file
//! dupehunter scan ~/Downloads --output json --output-file report.json
//!
//! # Only images between 1 KiB and 1 GiB, hashed with SHA-256
//! dupehunter scan ~/Pictures --algorithm sha256 --extensions jpg,png --min-size 1KiB --max-size 1GiB
//!
//! # Preview deleting every copy but the oldest, backing them up first
//! dupehunter scan ~/Pictures --delete --keep oldest --backup-dir ~/dupe-backups --dry-run
//!
//! # Write the default configuration file
//! dupehunter config --init
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::actions::KeepStrategy;
use crate::config::Config;
use crate::output::OutputFormat;
use crate::scanner::HashAlgorithm;

/// Duplicate file finder with size-first partitioning and parallel hashing.
///
/// DupeHunter groups files by size, hashes only files whose size collides,
/// and reports groups of byte-identical files. Duplicates can be deleted
/// (optionally with a backup) or moved aside.
#[derive(Debug, Parser)]
#[command(name = "dupehunter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (defaults to config.toml in the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for DupeHunter.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate files
    Scan(ScanArgs),
    /// Show or initialise the configuration
    Config(ConfigArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory path to scan for duplicates
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Digest algorithm: md5, sha1 or sha256
    #[arg(short, long, value_name = "ALGO")]
    pub algorithm: Option<HashAlgorithm>,

    /// Minimum file size to consider (e.g., 1KB, 1MB, 1GB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Maximum file size to consider (e.g., 1KB, 1MB, 1GB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Only scan these extensions (comma-separated, dot optional)
    #[arg(short, long, value_name = "EXT", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Extra directory names to skip (added to the configured set)
    #[arg(long, value_name = "NAME", value_delimiter = ',')]
    pub exclude_dirs: Vec<String>,

    /// Number of hashing threads
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Read chunk size for hashing (e.g., 8KiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub chunk_size: Option<u64>,

    /// Report format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Delete every duplicate except the kept copy
    #[arg(long, conflicts_with = "move_to")]
    pub delete: bool,

    /// Move every duplicate except the kept copy into this directory
    #[arg(long, value_name = "DIR")]
    pub move_to: Option<PathBuf>,

    /// Which copy of each group to keep
    #[arg(short, long, value_enum)]
    pub keep: Option<KeepStrategy>,

    /// Back up deleted files into this directory first
    #[arg(long, value_name = "DIR", requires = "delete")]
    pub backup_dir: Option<PathBuf>,

    /// Show what would be deleted or moved without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl ScanArgs {
    /// Layer these flags over `config`.
    #[must_use]
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm.to_string();
        }
        if let Some(min) = self.min_size {
            config.min_size = min;
        }
        if self.max_size.is_some() {
            config.max_size = self.max_size;
        }
        if !self.extensions.is_empty() {
            config.extensions.clone_from(&self.extensions);
        }
        for name in &self.exclude_dirs {
            if !config.exclude_dirs.contains(name) {
                config.exclude_dirs.push(name.clone());
            }
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(chunk) = self.chunk_size {
            config.chunk_size = usize::try_from(chunk).unwrap_or(usize::MAX);
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(keep) = self.keep {
            config.keep = keep;
        }
        if self.backup_dir.is_some() {
            config.backup_dir.clone_from(&self.backup_dir);
        }
        config
    }

    /// Whether any remediation was requested.
    #[must_use]
    pub fn wants_action(&self) -> bool {
        self.delete || self.move_to.is_some()
    }
}

/// Arguments for the config subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write the default configuration file
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing file with --init
    #[arg(long, requires = "init")]
    pub force: bool,
}

/// Parse a human-readable size string into bytes.
///
/// Supports the following formats:
/// - Plain numbers: "1024" -> 1024 bytes
/// - Decimal units: "1KB", "1MB", "1GB", "1TB" (powers of 1000)
/// - Binary units: "1KiB", "1MiB", "1GiB", "1TiB" (powers of 1024)
/// - Single-letter shortcuts: "1K", "1M", "1G", "1T" (decimal)
///
/// Case-insensitive for suffixes.
///
/// # Errors
///
/// Returns an error string if the input cannot be parsed.
///
/// # Examples
///
/// ```
/// use dupehunter::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1.5MB").unwrap(), 1_500_000);
/// ```
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
