use dupehunter::duplicates::{scan, DuplicateFinder, ScanConfig, ScanState, ScanStatus};
use dupehunter::scanner::{HashAlgorithm, Hasher};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn config() -> ScanConfig {
    ScanConfig::default().with_min_size(1)
}

fn write(dir: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn memberships(result: &dupehunter::duplicates::ScanResult) -> BTreeSet<Vec<PathBuf>> {
    result
        .duplicate_groups
        .values()
        .map(|g| g.files.clone())
        .collect()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();

    let result = scan(dir.path(), config()).unwrap();

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.total_files, 0);
    assert!(result.duplicate_groups.is_empty());
    assert!(result.errors.is_empty());
}

#[test]
fn test_scan_two_same_one_different() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.txt", b"same content");
    let b = write(dir.path(), "b.txt", b"same content");
    write(dir.path(), "c.txt", b"different content");

    let result = scan(dir.path(), config()).unwrap();

    assert_eq!(result.total_files, 3);
    assert_eq!(result.group_count(), 1);
    let group = result.duplicate_groups.values().next().unwrap();
    assert_eq!(group.len(), 2);
    assert!(group.contains(&a));
    assert!(group.contains(&b));
    assert_eq!(group.size(), 12);
    assert_eq!(result.duplicate_file_count(), 1);
    assert_eq!(result.reclaimable_bytes(), 12);
}

#[test]
fn test_scan_min_size_excludes_small_file() {
    let dir = tempdir().unwrap();
    write(dir.path(), "small.txt", b"small");
    write(dir.path(), "large.txt", b"large content here");

    let result = scan(dir.path(), ScanConfig::default().with_min_size(10)).unwrap();

    assert_eq!(result.total_files, 1);
    assert_eq!(result.total_size_bytes, 18);
}

#[test]
fn test_scan_extension_allow_list() {
    let dir = tempdir().unwrap();
    write(dir.path(), "script.txt", b"print('hello')");
    write(dir.path(), "script.py", b"print('hello')");

    let result = scan(dir.path(), config().with_extensions([".txt"])).unwrap();

    assert_eq!(result.total_files, 1);
    assert!(result.duplicate_groups.is_empty());
}

#[test]
fn test_filter_boundaries_are_inclusive() {
    let dir = tempdir().unwrap();
    for (len, tag) in [(9usize, "under"), (10, "min"), (20, "max"), (21, "over")] {
        let content = vec![b'x'; len];
        write(dir.path(), &format!("{tag}_1.bin"), &content);
        write(dir.path(), &format!("{tag}_2.bin"), &content);
    }

    let result = scan(
        dir.path(),
        ScanConfig::default().with_min_size(10).with_max_size(Some(20)),
    )
    .unwrap();

    assert_eq!(result.total_files, 4);
    let sizes: BTreeSet<u64> = result.duplicate_groups.keys().map(|k| k.size).collect();
    assert_eq!(sizes, BTreeSet::from([10, 20]));
}

#[test]
fn test_git_directory_excluded_at_any_depth() {
    let dir = tempdir().unwrap();
    write(dir.path(), ".git/objects/aa", b"tracked content");
    write(dir.path(), "project/sub/.git/HEAD", b"tracked content");
    write(dir.path(), "project/file.txt", b"tracked content");

    let result = scan(dir.path(), config()).unwrap();

    assert_eq!(result.total_files, 1);
    assert!(result.duplicate_groups.is_empty());
}

#[test]
fn test_custom_excluded_dirs_replace_defaults() {
    let dir = tempdir().unwrap();
    write(dir.path(), "build/out.bin", b"artifact bytes");
    write(dir.path(), "node_modules/pkg.bin", b"artifact bytes");

    let result = scan(dir.path(), config().with_excluded_dirs(["build"])).unwrap();

    assert_eq!(result.total_files, 1);
}

#[test]
fn test_same_size_different_content_is_not_a_group() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.bin", b"AAAAAAAA");
    write(dir.path(), "b.bin", b"BBBBBBBB");
    write(dir.path(), "c.bin", b"CCCCCCCC");

    let result = scan(dir.path(), config()).unwrap();

    assert_eq!(result.total_files, 3);
    assert!(result.duplicate_groups.is_empty());
}

#[test]
fn test_every_group_shares_size_and_digest() {
    let dir = tempdir().unwrap();
    for i in 0..6 {
        let content = format!("payload {}", i % 3).repeat(i % 3 + 1);
        write(dir.path(), &format!("dir{i}/file.dat"), content.as_bytes());
        write(dir.path(), &format!("copy{i}.dat"), content.as_bytes());
    }

    let result = scan(dir.path(), config().with_algorithm(HashAlgorithm::Sha256)).unwrap();
    let hasher = Hasher::default();

    assert_eq!(result.group_count(), 3);
    for group in result.duplicate_groups.values() {
        assert!(group.len() >= 2);
        for path in &group.files {
            assert_eq!(fs::metadata(path).unwrap().len(), group.size());
            assert_eq!(
                hasher.hash(path, HashAlgorithm::Sha256).unwrap(),
                group.digest()
            );
        }
    }
}

#[test]
fn test_no_path_in_two_groups() {
    let dir = tempdir().unwrap();
    for i in 0..10 {
        let content = format!("group-{}", i % 4);
        write(dir.path(), &format!("f{i}.txt"), content.as_bytes());
    }

    let result = scan(dir.path(), config()).unwrap();

    let mut seen = BTreeSet::new();
    for group in result.duplicate_groups.values() {
        for path in &group.files {
            assert!(seen.insert(path.clone()), "{} in two groups", path.display());
        }
    }
}

#[test]
fn test_scan_is_idempotent() {
    let dir = tempdir().unwrap();
    for i in 0..12 {
        write(dir.path(), &format!("n{i}.txt"), format!("v{}", i % 5).as_bytes());
    }

    let first = scan(dir.path(), config()).unwrap();
    let second = scan(dir.path(), config()).unwrap();

    assert_eq!(memberships(&first), memberships(&second));
    assert_eq!(first.total_files, second.total_files);
}

#[test]
fn test_each_algorithm_finds_the_same_groups() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"identical bytes");
    write(dir.path(), "b", b"identical bytes");
    write(dir.path(), "c", b"identical bytez");

    let results: Vec<_> = HashAlgorithm::ALL
        .iter()
        .map(|a| scan(dir.path(), config().with_algorithm(*a)).unwrap())
        .collect();

    for (algorithm, result) in HashAlgorithm::ALL.iter().zip(&results) {
        assert_eq!(result.group_count(), 1);
        assert_eq!(result.algorithm, *algorithm);
        let digest = result.duplicate_groups.keys().next().unwrap().digest.clone();
        assert_eq!(digest.len(), algorithm.hex_len());
    }
    assert_eq!(memberships(&results[0]), memberships(&results[2]));
}

#[test]
fn test_empty_files_group_together() {
    let dir = tempdir().unwrap();
    write(dir.path(), "empty1", b"");
    write(dir.path(), "empty2", b"");

    let result = scan(dir.path(), ScanConfig::default().with_min_size(0)).unwrap();

    assert_eq!(result.group_count(), 1);
    assert_eq!(result.reclaimable_bytes(), 0);
}

#[test]
fn test_missing_root_is_reported_not_raised() {
    let dir = tempdir().unwrap();
    let finder = DuplicateFinder::new(config()).unwrap();

    let result = finder.scan(&dir.path().join("does-not-exist")).unwrap();

    assert_eq!(result.status, ScanStatus::Failed);
    assert_eq!(finder.state(), ScanState::Failed);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("not found"));
}

#[test]
fn test_shared_hasher_caches_across_finders() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"cache me");
    write(dir.path(), "b", b"cache me");
    let hasher = std::sync::Arc::new(Hasher::default());

    let first = DuplicateFinder::with_hasher(config(), hasher.clone()).unwrap();
    first.scan(dir.path()).unwrap();
    assert_eq!(hasher.cache_len(), 2);

    let second = DuplicateFinder::with_hasher(config(), hasher.clone()).unwrap();
    let result = second.scan(dir.path()).unwrap();

    assert_eq!(result.group_count(), 1);
    assert_eq!(hasher.cache_len(), 2);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_does_not_abort_scan() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"readable twin");
    write(dir.path(), "b", b"readable twin");
    let locked = write(dir.path(), "locked", b"readable twin");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits; only check the invariant that matters.
    let result = scan(dir.path(), config()).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.group_count(), 1);
    assert!(result.duplicate_groups.values().next().unwrap().len() >= 2);
}
