use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time source for the watch loop.
pub trait Clock {
    /// Monotonic time since the clock was created.
    fn elapsed(&self) -> Duration;
    /// Wall-clock time, used for clip names and manifests.
    fn wall(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn wall(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock advanced by hand; clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: DateTime<Local>,
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(origin: DateTime<Local>) -> Self {
        Self {
            origin,
            millis: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, at: Duration) {
        self.millis.store(at.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }

    fn wall(&self) -> DateTime<Local> {
        self.origin + chrono::Duration::milliseconds(self.elapsed().as_millis() as i64)
    }
}
