//! Background scan sessions.
//!
//! A [`ScanSessions`] table lets a long-lived caller (a web layer, a daemon,
//! a test harness) start scans in the background and poll or cancel them by
//! an opaque [`SessionId`], without any process-wide "current scan" state.
//!
//! # Architecture
//!
//! * [`table`]: the lock-guarded session table and its progress snapshots.
//!
//! # Example
//!
//! ```no_run
//! use dupehunter::duplicates::ScanConfig;
//! use dupehunter::session::ScanSessions;
//! use std::path::Path;
//!
//! let sessions = ScanSessions::new();
//! let id = sessions.start(Path::new("/data"), ScanConfig::default()).unwrap();
//! let status = sessions.status(id).unwrap();
//! println!("{id}: {} ({}/{})", status.state, status.done, status.total);
//! let result = sessions.wait(id).unwrap();
//! println!("{} groups", result.group_count());
//! ```

pub mod table;

use std::io;

use thiserror::Error;

use crate::duplicates::{ConfigError, FinderError};

pub use table::{ScanSessions, SessionId, SessionStatus};

/// Errors from the session table.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session with this id exists.
    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    /// The session's result was already collected by an earlier `wait`.
    #[error("session {0} has already been waited on")]
    AlreadyJoined(SessionId),

    /// The scan configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The scan itself was rejected.
    #[error(transparent)]
    Finder(#[from] FinderError),

    /// The background thread could not be started.
    #[error("failed to spawn scan thread: {0}")]
    Spawn(#[source] io::Error),

    /// The background thread panicked.
    #[error("scan thread for session {0} panicked")]
    Panicked(SessionId),
}
