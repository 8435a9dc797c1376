use dupehunter::duplicates::{DuplicateFinder, FinderError, ScanConfig, ScanState, ScanStatus};
use dupehunter::progress::ProgressObserver;
use dupehunter::signal::ShutdownHandler;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use tempfile::tempdir;

/// `partitions` size classes with `per_partition` identical files each.
fn make_tree(root: &Path, partitions: usize, per_partition: usize) -> u64 {
    for p in 0..partitions {
        let content = "x".repeat(p + 1);
        let sub = root.join(format!("d{}", p % 7));
        fs::create_dir_all(&sub).unwrap();
        for f in 0..per_partition {
            fs::write(sub.join(format!("p{p}_f{f}.bin")), &content).unwrap();
        }
    }
    (partitions * per_partition) as u64
}

fn config() -> ScanConfig {
    ScanConfig::default().with_min_size(1).with_worker_count(1)
}

#[test]
fn test_cancel_mid_scan_returns_partial_result() {
    let dir = tempdir().unwrap();
    let tree_size = make_tree(dir.path(), 40, 3);

    let finder = Arc::new(DuplicateFinder::new(config()).unwrap());
    let weak = Arc::downgrade(&finder);
    finder.set_progress_observer(Arc::new(move |_done: u64, _total: u64, _msg: &str| {
        if let Some(finder) = weak.upgrade() {
            finder.cancel();
        }
    }));

    let result = finder.scan(dir.path()).unwrap();

    assert_eq!(result.status, ScanStatus::Cancelled);
    assert!(result.is_cancelled());
    assert!(result.total_files <= tree_size);
    assert!(result.group_count() <= 40);
    assert_eq!(finder.state(), ScanState::Cancelled);
}

#[test]
fn test_cancel_when_idle_is_noop() {
    let dir = tempdir().unwrap();
    make_tree(dir.path(), 3, 2);
    let finder = DuplicateFinder::new(config()).unwrap();

    finder.cancel();
    finder.cancel();
    let result = finder.scan(dir.path()).unwrap();

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.group_count(), 3);
}

#[test]
fn test_scan_after_cancel_starts_fresh() {
    let dir = tempdir().unwrap();
    make_tree(dir.path(), 10, 2);

    let finder = Arc::new(DuplicateFinder::new(config()).unwrap());
    let weak = Arc::downgrade(&finder);
    finder.set_progress_observer(Arc::new(move |_d: u64, _t: u64, _m: &str| {
        if let Some(finder) = weak.upgrade() {
            finder.cancel();
        }
    }));
    assert!(finder.scan(dir.path()).unwrap().is_cancelled());

    finder.clear_progress_observer();
    let result = finder.scan(dir.path()).unwrap();

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.group_count(), 10);
}

#[test]
fn test_shutdown_handler_cancels_attached_finder() {
    let dir = tempdir().unwrap();
    make_tree(dir.path(), 30, 2);

    let handler = ShutdownHandler::new();
    let finder = Arc::new(DuplicateFinder::new(config()).unwrap());
    handler.attach(Arc::clone(&finder));
    let hook = handler.clone();
    finder.set_progress_observer(Arc::new(move |_d: u64, _t: u64, _m: &str| {
        hook.request_shutdown();
    }));

    let result = finder.scan(dir.path()).unwrap();
    handler.detach();

    assert!(handler.is_shutdown_requested());
    assert_eq!(result.status, ScanStatus::Cancelled);
}

struct Gate {
    entered: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl ProgressObserver for Gate {
    fn on_progress(&self, _done: u64, _total: u64, _message: &str) {}

    fn on_stage(&self, stage: &str) {
        if stage == "walking" {
            if let Some(tx) = self.entered.lock().unwrap().take() {
                tx.send(()).unwrap();
                let _ = self.release.lock().unwrap().recv();
            }
        }
    }
}

#[test]
fn test_second_scan_while_running_is_busy() {
    let dir = tempdir().unwrap();
    make_tree(dir.path(), 2, 2);

    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let finder = Arc::new(DuplicateFinder::new(config()).unwrap());
    finder.set_progress_observer(Arc::new(Gate {
        entered: Mutex::new(Some(entered_tx)),
        release: Mutex::new(release_rx),
    }));

    let runner = Arc::clone(&finder);
    let root = dir.path().to_path_buf();
    let handle = thread::spawn(move || runner.scan(&root));

    entered_rx.recv().unwrap();
    assert!(finder.is_running());
    assert_eq!(finder.scan(dir.path()).unwrap_err(), FinderError::Busy);
    release_tx.send(()).unwrap();

    let first = handle.join().unwrap().unwrap();
    assert_eq!(first.status, ScanStatus::Completed);
    assert_eq!(first.group_count(), 2);
    assert!(!finder.is_running());
}

#[test]
fn test_progress_is_monotonic_and_complete() {
    let dir = tempdir().unwrap();
    let tree_size = make_tree(dir.path(), 12, 2);

    let last = Arc::new(AtomicU64::new(0));
    let calls = Arc::new(Mutex::new(Vec::new()));
    let (last_c, calls_c) = (Arc::clone(&last), Arc::clone(&calls));
    let finder = DuplicateFinder::new(config().with_worker_count(4)).unwrap();
    finder.set_progress_observer(Arc::new(move |done: u64, total: u64, msg: &str| {
        let previous = last_c.swap(done, Ordering::SeqCst);
        assert!(done >= previous);
        calls_c.lock().unwrap().push((done, total, msg.to_string()));
    }));

    finder.scan(dir.path()).unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 12);
    let (done, total, msg) = calls.last().unwrap();
    assert_eq!(*done, tree_size);
    assert_eq!(*total, tree_size);
    assert_eq!(msg, &format!("Processed {tree_size}/{tree_size} files"));
}
