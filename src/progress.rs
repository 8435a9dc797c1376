//! Progress reporting utilities using indicatif.
//!
//! This module defines the [`ProgressObserver`] trait the scan engine reports
//! through, and [`ProgressReporter`], which renders those reports as terminal
//! progress bars for the CLI.
//!
//! Observers are invoked from the thread that called
//! [`DuplicateFinder::scan`](crate::duplicates::DuplicateFinder::scan), one
//! call at a time, with a monotonically non-decreasing `done` count. They
//! should return quickly; a slow observer delays merging of further results.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Receiver of scan progress updates.
///
/// Any `Fn(u64, u64, &str) + Send + Sync` closure is an observer.
///
/// # Example
///
/// ```
/// use dupehunter::progress::ProgressObserver;
///
/// let observer = |done: u64, total: u64, message: &str| {
///     println!("{done}/{total}: {message}");
/// };
/// observer.on_progress(1, 2, "Hashed 1 of 2 files");
/// ```
pub trait ProgressObserver: Send + Sync {
    /// Called after each size partition has been hashed.
    ///
    /// # Arguments
    ///
    /// * `done` - Files processed so far across all partitions
    /// * `total` - Files across all partitions of this scan
    /// * `message` - Human-readable status line
    fn on_progress(&self, done: u64, total: u64, message: &str);

    /// Called when the scan enters a new stage ("walking", "partitioning",
    /// "hashing") or finishes ("done").
    fn on_stage(&self, _stage: &str) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(u64, u64, &str) + Send + Sync,
{
    fn on_progress(&self, done: u64, total: u64, message: &str) {
        self(done, total, message);
    }
}

/// Terminal progress reporter.
///
/// Shows a spinner while the directory tree is walked and a bar while size
/// partitions are hashed.
pub struct ProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, nothing is drawn.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupehunter::progress::ProgressReporter;
    ///
    /// let progress = ProgressReporter::new(true);
    /// assert!(progress.is_quiet());
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    /// Check if drawing is suppressed.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn replace(&self, next: Option<ProgressBar>) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.take() {
                previous.finish_and_clear();
            }
            *slot = next;
        }
    }
}

impl ProgressObserver for ProgressReporter {
    fn on_progress(&self, done: u64, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        let is_bar = slot.as_ref().is_some_and(|pb| pb.length().is_some());
        if !is_bar {
            if let Some(spinner) = slot.take() {
                spinner.finish_and_clear();
            }
            let pb = ProgressBar::new(total);
            pb.set_style(Self::bar_style());
            *slot = Some(pb);
        }
        if let Some(pb) = slot.as_ref() {
            pb.set_length(total);
            pb.set_position(done);
            pb.set_message(message.to_string());
        }
    }

    fn on_stage(&self, stage: &str) {
        if self.quiet {
            return;
        }

        match stage {
            "walking" | "partitioning" => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(Self::spinner_style());
                pb.set_message(format!("{}{}", stage[..1].to_uppercase(), &stage[1..]));
                pb.enable_steady_tick(Duration::from_millis(100));
                self.replace(Some(pb));
            }
            "done" => self.replace(None),
            _ => {}
        }
    }
}
