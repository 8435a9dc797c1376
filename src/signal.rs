//! Signal handling for graceful cancellation.
//!
//! Ctrl+C sets a process-wide shutdown flag and cancels the scan of the
//! [`DuplicateFinder`] currently attached to the handler. The scan then
//! returns its partial result with status `Cancelled`, and the CLI exits with
//! code 130.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dupehunter::duplicates::{DuplicateFinder, ScanConfig};
//! use dupehunter::signal::install_handler;
//! use std::sync::Arc;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//! let finder = Arc::new(DuplicateFinder::new(ScanConfig::default()).unwrap());
//! handler.attach(Arc::clone(&finder));
//! // ... finder.scan(...) ...
//! handler.detach();
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::duplicates::DuplicateFinder;

/// Exit code for SIGINT (Ctrl+C) interruption.
/// This follows Unix convention: 128 + signal number (SIGINT = 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared shutdown state: a flag plus the finder to cancel.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
    target: Arc<Mutex<Option<Arc<DuplicateFinder>>>>,
}

impl std::fmt::Debug for ShutdownHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandler")
            .field("shutdown_requested", &self.is_shutdown_requested())
            .finish_non_exhaustive()
    }
}

impl ShutdownHandler {
    /// Create a new shutdown handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Set the shutdown flag and cancel the attached finder's scan, if any.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let target = self.target.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(finder) = target.as_ref() {
            finder.cancel();
        }
    }

    /// Route future shutdown requests to `finder`.
    ///
    /// If shutdown was already requested the finder is cancelled right away.
    pub fn attach(&self, finder: Arc<DuplicateFinder>) {
        let mut target = self.target.lock().unwrap_or_else(PoisonError::into_inner);
        *target = Some(finder);
        if self.is_shutdown_requested() {
            if let Some(finder) = target.as_ref() {
                finder.cancel();
            }
        }
    }

    /// Stop routing shutdown requests to a finder.
    pub fn detach(&self) {
        *self.target.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Reset the shutdown flag to `false`.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install a Ctrl+C handler, or return the one already installed.
///
/// The returned handler has its flag reset so a previous interrupt does not
/// leak into the next run.
///
/// # Errors
///
/// Returns [`SignalError`] if the OS refuses the handler.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = GLOBAL_HANDLER.get_or_init(ShutdownHandler::new).clone();
    let hook = handler.clone();

    match ctrlc::set_handler(move || {
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing current files...");
        let _ = std::io::stderr().flush();
        log::info!("Shutdown signal received");
        hook.request_shutdown();
    }) {
        Ok(()) => Ok(handler),
        Err(ctrlc::Error::MultipleHandlers) => {
            log::debug!("Ctrl+C handler already registered, using unhooked handler");
            Ok(handler)
        }
        Err(e) => Err(SignalError::InstallFailed(e)),
    }
}
