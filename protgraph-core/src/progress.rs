//! Progress reporting for long-running graph builds and evaluations.
//!
//! The CLI uses `IndicatifReporter` for a user-visible progress bar.
//! Library callers can use `NoopReporter` or provide their own implementation.

use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressStyle};

/// Trait for reporting progress of pipeline stages.
///
/// Implementations must tolerate `advance` being called from several
/// worker threads at once.
pub trait ProgressReporter: Send + Sync {
    /// Begin a new task with an optional total count.
    fn start(&self, task: &str, total: Option<u64>);

    /// Advance progress by the given amount.
    fn advance(&self, amount: u64);

    /// Mark the current task as finished.
    fn finish(&self);

    /// Display an informational message.
    fn message(&self, msg: &str);
}

/// No-op reporter for library callers that don't need progress output.
#[derive(Debug, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn start(&self, _task: &str, _total: Option<u64>) {}
    fn advance(&self, _amount: u64) {}
    fn finish(&self) {}
    fn message(&self, _msg: &str) {}
}

/// Reporter backed by an `indicatif` progress bar for CLI use.
#[derive(Debug)]
pub struct IndicatifReporter {
    bar: ProgressBar,
    completed: AtomicU64,
}

impl Default for IndicatifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatifReporter {
    /// A reporter drawing to stderr.
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::new(0),
            completed: AtomicU64::new(0),
        }
    }

    /// A reporter that tracks counts but never draws (`--quiet`).
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            completed: AtomicU64::new(0),
        }
    }

    /// Units advanced since the last `start`.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

impl ProgressReporter for IndicatifReporter {
    fn start(&self, task: &str, total: Option<u64>) {
        self.completed.store(0, Ordering::Relaxed);
        if let Some(total) = total {
            self.bar.set_length(total);
            self.bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({eta})",
                )
                .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("=> ")),
            );
        } else {
            self.bar.set_length(0);
            self.bar.set_style(
                ProgressStyle::with_template("{spinner:.green} {msg} {pos} items")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
        }
        self.bar.set_message(task.to_string());
        self.bar.reset();
    }

    fn advance(&self, amount: u64) {
        self.completed.fetch_add(amount, Ordering::Relaxed);
        self.bar.inc(amount);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn message(&self, msg: &str) {
        self.bar.println(msg);
    }
}
