use std::sync::atomic::{AtomicI64, Ordering};

/// Source of "now" in seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 { chrono::Utc::now().timestamp() }
}

/// Manually driven clock for tests.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now_secs: i64) -> Self { Self { now: AtomicI64::new(now_secs) } }
    pub fn set(&self, now_secs: i64) { self.now.store(now_secs, Ordering::SeqCst); }
    pub fn advance(&self, secs: i64) { self.now.fetch_add(secs, Ordering::SeqCst); }
}

impl Clock for FixedClock {
    fn now_secs(&self) -> i64 { self.now.load(Ordering::SeqCst) }
}
