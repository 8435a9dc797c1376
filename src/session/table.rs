//! Lock-guarded table of background scans.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};

use super::SessionError;
use crate::duplicates::{DuplicateFinder, FinderError, ScanConfig, ScanResult, ScanState};
use crate::progress::ProgressObserver;
use crate::scanner::Hasher;

/// Opaque handle to a background scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan-{}", self.0)
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Lifecycle state
    pub state: ScanState,
    /// Pipeline stage last entered ("walking", "partitioning", "hashing", "done")
    pub stage: String,
    /// Files hashed so far
    pub done: u64,
    /// Files to hash in total
    pub total: u64,
    /// Last progress message
    pub message: String,
}

impl SessionStatus {
    fn starting() -> Self {
        Self {
            state: ScanState::Running,
            stage: String::from("starting"),
            done: 0,
            total: 0,
            message: String::new(),
        }
    }
}

/// Observer that records the latest progress and forwards late cancels.
struct SessionProgress {
    snapshot: Mutex<SessionStatus>,
    cancel_requested: AtomicBool,
    finder: Mutex<Weak<DuplicateFinder>>,
}

impl SessionProgress {
    fn new() -> Self {
        Self {
            snapshot: Mutex::new(SessionStatus::starting()),
            cancel_requested: AtomicBool::new(false),
            finder: Mutex::new(Weak::new()),
        }
    }

    fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
        if let Some(finder) = lock(&self.finder).upgrade() {
            finder.cancel();
        }
    }

    fn finish(&self, state: ScanState) {
        lock(&self.snapshot).state = state;
    }
}

impl ProgressObserver for SessionProgress {
    fn on_progress(&self, done: u64, total: u64, message: &str) {
        let mut snapshot = lock(&self.snapshot);
        snapshot.done = done;
        snapshot.total = total;
        snapshot.message = message.to_string();
    }

    fn on_stage(&self, stage: &str) {
        lock(&self.snapshot).stage = stage.to_string();
        // A cancel that arrived before the scan armed its flag is applied here,
        // once the finder is running and can receive it.
        if self.cancel_requested.load(Ordering::SeqCst) {
            if let Some(finder) = lock(&self.finder).upgrade() {
                finder.cancel();
            }
        }
    }
}

struct Session {
    root: PathBuf,
    progress: Arc<SessionProgress>,
    handle: Option<JoinHandle<Result<ScanResult, FinderError>>>,
}

/// Caller-owned registry of background scans keyed by [`SessionId`].
///
/// Every session runs on its own thread with a fresh [`DuplicateFinder`];
/// sessions share one [`Hasher`] so repeated scans of unchanged files hit
/// the digest cache.
pub struct ScanSessions {
    next_id: AtomicU64,
    hasher: Arc<Hasher>,
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl fmt::Debug for ScanSessions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanSessions")
            .field("sessions", &lock(&self.sessions).len())
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

impl Default for ScanSessions {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSessions {
    /// Create an empty table with its own hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(Arc::new(Hasher::default()))
    }

    /// Create an empty table whose sessions share `hasher`.
    ///
    /// The digest cache is never evicted, so it grows with every distinct
    /// file any session hashes. A long-lived table should call
    /// [`ScanSessions::clear_cache`] between batches of scans.
    #[must_use]
    pub fn with_hasher(hasher: Arc<Hasher>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            hasher,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Start scanning `directory` in the background.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if `config` is invalid, or
    /// [`SessionError::Spawn`] if the thread cannot be started.
    pub fn start(&self, directory: &Path, config: ScanConfig) -> Result<SessionId, SessionError> {
        let finder = Arc::new(DuplicateFinder::with_hasher(config, Arc::clone(&self.hasher))?);
        let progress = Arc::new(SessionProgress::new());
        *lock(&progress.finder) = Arc::downgrade(&finder);
        finder.set_progress_observer(Arc::clone(&progress) as Arc<dyn ProgressObserver>);

        let id = SessionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let root = directory.to_path_buf();
        let thread_progress = Arc::clone(&progress);
        let thread_root = root.clone();

        let handle = thread::Builder::new()
            .name(format!("dupehunter-{id}"))
            .spawn(move || {
                let outcome = finder.scan(&thread_root);
                let state = match &outcome {
                    Ok(result) => result.status.into(),
                    Err(_) => ScanState::Failed,
                };
                thread_progress.finish(state);
                outcome
            })
            .map_err(SessionError::Spawn)?;

        log::info!("Started session {} for {}", id, root.display());
        lock(&self.sessions).insert(
            id,
            Session {
                root,
                progress,
                handle: Some(handle),
            },
        );
        Ok(id)
    }

    /// Current status of a session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownSession`] for an unknown id.
    pub fn status(&self, id: SessionId) -> Result<SessionStatus, SessionError> {
        let sessions = lock(&self.sessions);
        let session = sessions
            .get(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        let status = lock(&session.progress.snapshot).clone();
        Ok(status)
    }

    /// Root directory a session is scanning.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownSession`] for an unknown id.
    pub fn root(&self, id: SessionId) -> Result<PathBuf, SessionError> {
        lock(&self.sessions)
            .get(&id)
            .map(|s| s.root.clone())
            .ok_or(SessionError::UnknownSession(id))
    }

    /// Request cancellation. Idempotent; a finished session is unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownSession`] for an unknown id.
    pub fn cancel(&self, id: SessionId) -> Result<(), SessionError> {
        let sessions = lock(&self.sessions);
        let session = sessions
            .get(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        log::info!("Cancelling session {}", id);
        session.progress.request_cancel();
        Ok(())
    }

    /// Block until the session finishes and return its result.
    ///
    /// The session stays in the table so its status can still be read.
    ///
    /// # Errors
    ///
    /// - [`SessionError::UnknownSession`] for an unknown id
    /// - [`SessionError::AlreadyJoined`] if the result was already taken
    /// - [`SessionError::Panicked`] if the scan thread panicked
    pub fn wait(&self, id: SessionId) -> Result<ScanResult, SessionError> {
        let handle = {
            let mut sessions = lock(&self.sessions);
            let session = sessions
                .get_mut(&id)
                .ok_or(SessionError::UnknownSession(id))?;
            session
                .handle
                .take()
                .ok_or(SessionError::AlreadyJoined(id))?
        };

        match handle.join() {
            Ok(outcome) => Ok(outcome?),
            Err(_) => {
                log::error!("Session {} panicked", id);
                if let Some(session) = lock(&self.sessions).get(&id) {
                    session.progress.finish(ScanState::Failed);
                }
                Err(SessionError::Panicked(id))
            }
        }
    }

    /// Drop a session from the table, cancelling it if still running.
    ///
    /// Returns whether the id was known. A running scan thread is detached
    /// and winds down on its own.
    pub fn remove(&self, id: SessionId) -> bool {
        let removed = lock(&self.sessions).remove(&id);
        match removed {
            Some(session) => {
                if session.handle.as_ref().is_some_and(|h| !h.is_finished()) {
                    session.progress.request_cancel();
                }
                log::debug!("Removed session {}", id);
                true
            }
            None => false,
        }
    }

    /// Ids of all sessions in the table, oldest first.
    #[must_use]
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = lock(&self.sessions).keys().copied().collect();
        ids.sort();
        ids
    }

    /// Number of sessions in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every digest memoized by the shared hasher.
    ///
    /// Running sessions keep working; they just recompute digests.
    pub fn clear_cache(&self) {
        log::debug!("Clearing {} cached digests", self.hasher.cache_len());
        self.hasher.clear_cache();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
