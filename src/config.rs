//! Application configuration management.
//!
//! Settings are layered with figment, lowest precedence first:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file (`--config PATH`, or `config.toml` in the platform config
//!    directory when present)
//! 3. Environment variables prefixed `DUPEHUNTER_` (`__` separates nesting)
//! 4. Command-line flags, applied by the CLI on top of the loaded value
//!
//! # Example
//!
//! ```toml
//! algorithm = "sha256"
//! min_size = 4096
//! extensions = [".jpg", ".png"]
//! exclude_dirs = [".git", "target"]
//! threads = 8
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::actions::KeepStrategy;
use crate::duplicates::{
    ConfigError, ScanConfig, DEFAULT_EXCLUDED_DIRS, DEFAULT_MIN_SIZE, DEFAULT_WORKER_COUNT,
};
use crate::output::OutputFormat;
use crate::scanner::{HashAlgorithm, DEFAULT_CHUNK_SIZE};

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "DUPEHUNTER_";

/// File name of the configuration inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Digest algorithm name (md5, sha1, sha256)
    pub algorithm: String,
    /// Smallest file size scanned, in bytes
    pub min_size: u64,
    /// Largest file size scanned, in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    /// Extension allow-list; empty allows every extension
    pub extensions: Vec<String>,
    /// Directory names never descended into
    pub exclude_dirs: Vec<String>,
    /// Number of hashing workers
    pub threads: usize,
    /// Read chunk size for hashing, in bytes
    pub chunk_size: usize,
    /// Report format
    pub output: OutputFormat,
    /// Which copy survives remediation
    pub keep: KeepStrategy,
    /// Where deleted files are backed up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default().to_string(),
            min_size: DEFAULT_MIN_SIZE,
            max_size: None,
            extensions: Vec::new(),
            exclude_dirs: DEFAULT_EXCLUDED_DIRS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            threads: DEFAULT_WORKER_COUNT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            output: OutputFormat::default(),
            keep: KeepStrategy::default(),
            backup_dir: None,
        }
    }
}

impl Config {
    /// Build the layered figment for `file` (defaults, file, environment).
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, the platform default file
    /// is used if present.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, or if any layer fails
    /// to parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) if !p.exists() => bail!("Config file not found: {}", p.display()),
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };

        if let Some(p) = &file {
            log::debug!("Loading configuration from {}", p.display());
        }

        Self::figment(file.as_deref())
            .extract()
            .context("Invalid configuration")
    }

    /// Default platform-specific configuration path, if one can be determined.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupehunter", "dupehunter")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Convert into a validated engine configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unknown algorithm or violated invariant.
    pub fn to_scan_config(&self) -> Result<ScanConfig, ConfigError> {
        let mut scan = ScanConfig::default()
            .with_algorithm_name(&self.algorithm)?
            .with_min_size(self.min_size)
            .with_max_size(self.max_size)
            .with_excluded_dirs(self.exclude_dirs.iter().cloned())
            .with_worker_count(self.threads)
            .with_read_chunk_bytes(self.chunk_size);
        if !self.extensions.is_empty() {
            scan = scan.with_extensions(&self.extensions);
        }
        scan.validate()?;
        Ok(scan)
    }

    /// Serialize as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Write the default configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and `force` is false, or on I/O
    /// failure.
    pub fn write_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, Self::default().to_toml()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote default configuration to {}", path.display());
        Ok(())
    }
}
