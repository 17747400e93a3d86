use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Progress reporting seam shared by parallel phases. `advance` is called
/// once per completed task from worker threads.
pub trait ProgressSink: Sync {
    fn advance(&self);
}

/// Discards all progress events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn advance(&self) {}
}

/// Counts completed tasks and logs roughly every ten percent of the total.
#[derive(Debug)]
pub struct LogProgress {
    label: &'static str,
    total: usize,
    done: AtomicUsize,
}

impl LogProgress {
    pub fn new(label: &'static str, total: usize) -> Self {
        Self {
            label,
            total,
            done: AtomicUsize::new(0),
        }
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}

impl ProgressSink for LogProgress {
    fn advance(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if self.total == 0 {
            return;
        }
        let step = (self.total / 10).max(1);
        if done % step == 0 || done == self.total {
            log::info!("{}: {}/{}", self.label, done, self.total);
        }
    }
}

/// Scoped timing helper; a value, not process-wide state.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch(Instant);

impl Stopwatch {
    pub fn start() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}
