//! Settle delay strategies
//!
//! The chip needs time to absorb every register write. Production code blocks
//! the calling thread for the full interval; tests swap in a strategy that
//! records the wait instead of sleeping.

use std::time::Duration;

/// How the driver waits out the post-write settle interval
pub trait SettleDelay: Send {
    /// Wait for `duration` (or account for it) before returning
    fn settle(&mut self, duration: Duration);
}

/// Real wall-clock sleep on the calling thread
///
/// Not cancellable. Callers wanting non-blocking behaviour must move the whole
/// driver call to another thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingDelay;

impl SettleDelay for BlockingDelay {
    fn settle(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Returns immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl SettleDelay for NoDelay {
    fn settle(&mut self, _duration: Duration) {}
}

/// Virtual clock that accumulates requested waits without sleeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualClock {
    elapsed: Duration,
    settles: u64,
}

impl VirtualClock {
    /// Create a clock at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Total virtual time waited so far
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of settle calls observed
    pub fn settles(&self) -> u64 {
        self.settles
    }
}

impl SettleDelay for VirtualClock {
    fn settle(&mut self, duration: Duration) {
        self.elapsed += duration;
        self.settles += 1;
    }
}

impl<D: SettleDelay + ?Sized> SettleDelay for Box<D> {
    fn settle(&mut self, duration: Duration) {
        (**self).settle(duration);
    }
}
