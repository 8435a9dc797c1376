use dupehunter::actions::{apply, plan_all, Action, KeepStrategy};
use dupehunter::duplicates::{scan, ScanConfig};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_aged(dir: &Path, name: &str, content: &[u8], unix_secs: i64) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
    path
}

fn config() -> ScanConfig {
    ScanConfig::default().with_min_size(1)
}

#[test]
fn test_delete_all_but_oldest_with_backup() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    let backups = dir.path().join("backups");
    let old = write_aged(&data, "old.jpg", b"photo bytes", 1_600_000_000);
    let mid = write_aged(&data, "mid.jpg", b"photo bytes", 1_650_000_000);
    let new = write_aged(&data, "new.jpg", b"photo bytes", 1_700_000_000);

    let result = scan(&data, config()).unwrap();
    let plans = plan_all(result.duplicate_groups.values(), KeepStrategy::Oldest);
    let batch = apply(
        &plans,
        &Action::Delete {
            backup_dir: Some(backups.clone()),
        },
        false,
    );

    assert!(batch.all_succeeded());
    assert_eq!(batch.success_count(), 2);
    assert_eq!(batch.bytes_freed, 22);
    assert!(old.exists());
    assert!(!mid.exists());
    assert!(!new.exists());
    assert_eq!(fs::read_dir(&backups).unwrap().count(), 2);

    let rescan = scan(&data, config()).unwrap();
    assert!(rescan.duplicate_groups.is_empty());
}

#[test]
fn test_keep_newest_moves_the_rest() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    let holding = dir.path().join("holding");
    write_aged(&data, "a.txt", b"same text", 1_600_000_000);
    let newest = write_aged(&data, "b.txt", b"same text", 1_700_000_000);

    let result = scan(&data, config()).unwrap();
    let plans = plan_all(result.duplicate_groups.values(), KeepStrategy::Newest);
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].keep.path, newest);

    let batch = apply(
        &plans,
        &Action::Move {
            dest_dir: holding.clone(),
        },
        false,
    );

    assert!(batch.all_succeeded());
    assert!(newest.exists());
    assert!(!data.join("a.txt").exists());
    assert!(holding.join("a.txt").exists());
    assert_eq!(
        batch.successes[0].destination.as_deref(),
        Some(holding.join("a.txt").as_path())
    );
}

#[test]
fn test_dry_run_changes_nothing() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("x"), b"dup dup").unwrap();
    fs::write(dir.path().join("y"), b"dup dup").unwrap();

    let result = scan(dir.path(), config()).unwrap();
    let plans = plan_all(result.duplicate_groups.values(), KeepStrategy::First);
    let batch = apply(&plans, &Action::Delete { backup_dir: None }, true);

    assert!(batch.dry_run);
    assert_eq!(batch.success_count(), 1);
    assert!(dir.path().join("x").exists());
    assert!(dir.path().join("y").exists());
}

#[test]
fn test_file_changed_after_scan_is_left_alone() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"original").unwrap();
    fs::write(&b, b"original").unwrap();

    let result = scan(dir.path(), config()).unwrap();
    let plans = plan_all(result.duplicate_groups.values(), KeepStrategy::First);
    let victim = &plans[0].remove[0].path;
    fs::write(victim, b"edited after the scan").unwrap();

    let batch = apply(&plans, &Action::Delete { backup_dir: None }, false);

    assert_eq!(batch.failure_count(), 1);
    assert!(victim.exists());
    assert!(a.exists() && b.exists());
}

#[test]
fn test_missing_kept_copy_protects_the_rest() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"only copy left").unwrap();
    fs::write(dir.path().join("b.txt"), b"only copy left").unwrap();

    let result = scan(dir.path(), config()).unwrap();
    let plans = plan_all(result.duplicate_groups.values(), KeepStrategy::First);
    fs::remove_file(&plans[0].keep.path).unwrap();

    let batch = apply(&plans, &Action::Delete { backup_dir: None }, false);

    assert_eq!(batch.success_count(), 0);
    assert_eq!(batch.failure_count(), 1);
    assert!(dir.path().join("b.txt").exists());
}

#[test]
fn test_same_size_rewrite_after_scan_is_detected() {
    let dir = tempdir().unwrap();
    let a = write_aged(dir.path(), "a.txt", b"first version", 1_600_000_000);
    let b = write_aged(dir.path(), "b.txt", b"first version", 1_600_000_000);

    let result = scan(dir.path(), config()).unwrap();
    // Same length, different bytes, fresh mtime.
    fs::write(&b, b"other content").unwrap();
    let plans = plan_all(result.duplicate_groups.values(), KeepStrategy::First);
    let batch = apply(&plans, &Action::Delete { backup_dir: None }, false);

    assert_eq!(batch.success_count(), 0);
    assert_eq!(batch.failure_count(), 1);
    assert!(a.exists());
    assert!(b.exists());
    assert_eq!(fs::read(&b).unwrap(), b"other content");
}

#[test]
fn test_changed_kept_copy_skips_group() {
    let dir = tempdir().unwrap();
    let a = write_aged(dir.path(), "a.txt", b"keeper bytes", 1_600_000_000);
    let b = write_aged(dir.path(), "b.txt", b"keeper bytes", 1_600_000_000);

    let result = scan(dir.path(), config()).unwrap();
    fs::write(&a, b"edited bytes").unwrap();
    let plans = plan_all(result.duplicate_groups.values(), KeepStrategy::First);
    assert_eq!(plans[0].keep.path, a);

    let batch = apply(&plans, &Action::Delete { backup_dir: None }, false);

    assert_eq!(batch.success_count(), 0);
    assert!(batch.failures[0].1.starts_with("kept copy not verified"));
    assert!(b.exists());
}
