use dupehunter::duplicates::{ScanConfig, ScanState, ScanStatus};
use dupehunter::scanner::Hasher;
use dupehunter::session::{ScanSessions, SessionError};
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

fn config() -> ScanConfig {
    ScanConfig::default().with_min_size(1)
}

#[test]
fn test_poll_until_finished() {
    let dir = tempdir().unwrap();
    for i in 0..8 {
        fs::write(dir.path().join(format!("a{i}")), format!("data {i}")).unwrap();
        fs::write(dir.path().join(format!("b{i}")), format!("data {i}")).unwrap();
    }
    let sessions = ScanSessions::new();
    let id = sessions.start(dir.path(), config()).unwrap();

    let mut polls = 0;
    loop {
        let status = sessions.status(id).unwrap();
        assert!(status.done <= status.total || status.total == 0);
        if status.state.is_terminal() {
            break;
        }
        polls += 1;
        assert!(polls < 2_000, "session never finished");
        thread::sleep(Duration::from_millis(5));
    }

    let result = sessions.wait(id).unwrap();
    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.group_count(), 8);
    assert_eq!(sessions.status(id).unwrap().state, ScanState::Completed);
}

#[test]
fn test_sessions_share_hasher_cache() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("x"), b"shared").unwrap();
    fs::write(dir.path().join("y"), b"shared").unwrap();
    let hasher = Arc::new(Hasher::default());
    let sessions = ScanSessions::with_hasher(Arc::clone(&hasher));

    let first = sessions.start(dir.path(), config()).unwrap();
    sessions.wait(first).unwrap();
    let second = sessions.start(dir.path(), config()).unwrap();
    let result = sessions.wait(second).unwrap();

    assert_eq!(result.group_count(), 1);
    assert_eq!(hasher.cache_len(), 2);
    assert_eq!(sessions.len(), 2);
}

#[test]
fn test_clear_cache_between_batches() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("x"), b"batch one").unwrap();
    fs::write(dir.path().join("y"), b"batch one").unwrap();
    let hasher = Arc::new(Hasher::default());
    let sessions = ScanSessions::with_hasher(Arc::clone(&hasher));

    let first = sessions.start(dir.path(), config()).unwrap();
    sessions.wait(first).unwrap();
    assert_eq!(hasher.cache_len(), 2);

    sessions.clear_cache();
    assert_eq!(hasher.cache_len(), 0);

    let second = sessions.start(dir.path(), config()).unwrap();
    let result = sessions.wait(second).unwrap();
    assert_eq!(result.group_count(), 1);
    assert_eq!(hasher.cache_len(), 2);
}

#[test]
fn test_cancel_is_idempotent() {
    let dir = tempdir().unwrap();
    let sessions = ScanSessions::new();
    let id = sessions.start(dir.path(), config()).unwrap();

    sessions.cancel(id).unwrap();
    sessions.cancel(id).unwrap();
    let result = sessions.wait(id).unwrap();

    assert!(matches!(
        result.status,
        ScanStatus::Cancelled | ScanStatus::Completed
    ));
    // Cancelling a finished session is harmless.
    sessions.cancel(id).unwrap();
}

#[test]
fn test_errors_name_the_session() {
    let sessions = ScanSessions::new();
    let dir = tempdir().unwrap();
    let id = sessions.start(dir.path(), config()).unwrap();
    sessions.wait(id).unwrap();
    assert!(sessions.remove(id));

    let err = sessions.wait(id).unwrap_err();
    assert!(matches!(err, SessionError::UnknownSession(_)));
    assert_eq!(err.to_string(), format!("unknown session {id}"));
}
