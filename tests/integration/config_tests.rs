use dupehunter::actions::KeepStrategy;
use dupehunter::config::Config;
use dupehunter::duplicates::{ConfigError, DuplicateFinder, FinderError, ScanConfig};
use dupehunter::output::OutputFormat;
use dupehunter::scanner::HashAlgorithm;
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

pub static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all DUPEHUNTER_* environment variables to avoid interference.
pub fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("DUPEHUNTER_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_config_defaults_without_env() {
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.algorithm, "md5");
    assert_eq!(config.min_size, 1024);
    assert_eq!(config.threads, 4);
    assert_eq!(config.chunk_size, 8192);
    assert_eq!(config.output, OutputFormat::Text);
    assert_eq!(config.keep, KeepStrategy::First);
    assert_eq!(
        config.exclude_dirs,
        vec![".git", "node_modules", "__pycache__", ".vscode", ".idea"]
    );
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "algorithm = \"sha1\"\nmin_size = 10\nthreads = 2\n").unwrap();

    std::env::set_var("DUPEHUNTER_MIN_SIZE", "2048");
    std::env::set_var("DUPEHUNTER_KEEP", "newest");
    let config: Config = Config::figment(Some(&path)).extract().unwrap();
    clear_env();

    assert_eq!(config.algorithm, "sha1");
    assert_eq!(config.threads, 2);
    assert_eq!(config.min_size, 2048);
    assert_eq!(config.keep, KeepStrategy::Newest);
}

#[test]
fn test_load_explicit_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
algorithm = "sha256"
max_size = 1000000
exclude_dirs = ["target"]
backup_dir = "/tmp/backups"
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.max_size, Some(1_000_000));
    assert_eq!(config.exclude_dirs, vec!["target"]);
    assert_eq!(
        config.backup_dir.as_deref(),
        Some(std::path::Path::new("/tmp/backups"))
    );

    let scan = config.to_scan_config().unwrap();
    assert_eq!(scan.algorithm, HashAlgorithm::Sha256);
    assert!(scan.excluded_dir_names.contains("target"));
    assert!(!scan.excluded_dir_names.contains(".git"));
}

#[test]
fn test_invalid_toml_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "this is [not toml").unwrap();

    let result: Result<Config, _> = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .extract();

    assert!(result.is_err());
}

#[test]
fn test_finder_rejects_invalid_config_before_io() {
    assert_eq!(
        DuplicateFinder::new(ScanConfig::default().with_worker_count(0)).unwrap_err(),
        ConfigError::NoWorkers
    );
    assert_eq!(
        DuplicateFinder::new(ScanConfig::default().with_min_size(10).with_max_size(Some(5)))
            .unwrap_err(),
        ConfigError::MaxBelowMin { min: 10, max: 5 }
    );
    assert!(matches!(
        ScanConfig::default().with_algorithm_name("blake3"),
        Err(ConfigError::UnsupportedAlgorithm(_))
    ));

    let err = dupehunter::duplicates::scan(
        std::path::Path::new("/definitely/not/here"),
        ScanConfig::default().with_read_chunk_bytes(0),
    )
    .unwrap_err();
    assert_eq!(err, FinderError::Config(ConfigError::ZeroChunkSize));
}

#[test]
fn test_scan_config_roundtrips_through_json() {
    let config = ScanConfig::default()
        .with_algorithm(HashAlgorithm::Sha1)
        .with_extensions(["jpg"])
        .with_max_size(Some(4096));

    let json = serde_json::to_string(&config).unwrap();
    let back: ScanConfig = serde_json::from_str(&json).unwrap();

    assert_eq!(back, config);
}
