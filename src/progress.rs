use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives `(completed, total)` as a batch makes progress.
pub(crate) type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Counts finished requests and decides when to report them.
///
/// A report fires on every multiple of the refresh rate and once more on the
/// final completion. A refresh rate of zero (fewer than 100 requests) leaves
/// only the final report.
pub(crate) struct ProgressTracker {
    completed: AtomicU64,
    total: u64,
    refresh_rate: u64,
    callback: ProgressCallback,
}

impl ProgressTracker {
    pub fn new(total: u64, callback: ProgressCallback) -> Self {
        Self {
            completed: AtomicU64::new(0),
            total,
            refresh_rate: total / 100,
            callback,
        }
    }

    /// Records one finished request and returns the new count.
    ///
    /// The increment and the report decision use the value returned by a
    /// single `fetch_add`, so concurrent callers never observe the same count.
    pub fn on_request_finished(&self) -> u64 {
        let completed = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        debug_assert!(completed <= self.total);

        if should_report(completed, self.refresh_rate, self.total) {
            (self.callback)(completed, self.total);
        }

        completed
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn refresh_rate(&self) -> u64 {
        self.refresh_rate
    }
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("completed", &self.completed())
            .field("total", &self.total)
            .field("refresh_rate", &self.refresh_rate)
            .finish_non_exhaustive()
    }
}

fn should_report(completed: u64, refresh_rate: u64, total: u64) -> bool {
    completed == total || (refresh_rate > 0 && completed % refresh_rate == 0)
}
