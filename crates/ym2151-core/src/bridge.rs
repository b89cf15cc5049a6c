//! Call-level control surface for host bindings
//!
//! [`Bridge`] exposes the raw chip operations a host runtime needs: create,
//! write a register, clock once, reset, release. Arguments arrive as wide
//! integers and are range-checked here. Clock results are the engine's raw
//! values, not the halved PCM the renderer produces.
//!
//! [`SharedBridge`] wraps one bridge in a lock so a single engine instance can
//! be driven from any thread.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::backend::OpmBackend;
use crate::chip::OpmChip;
use crate::timing::{BlockingDelay, SettleDelay};
use crate::Result;

/// Host-facing wrapper over one [`OpmChip`]
pub struct Bridge<B: OpmBackend, D: SettleDelay = BlockingDelay> {
    chip: OpmChip<B, D>,
}

impl<B: OpmBackend> Bridge<B, BlockingDelay> {
    /// Bridge with no engine yet, sleeping for real after each write
    pub fn new() -> Self {
        Self::with_delay(BlockingDelay)
    }
}

impl<B: OpmBackend> Default for Bridge<B, BlockingDelay> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: OpmBackend, D: SettleDelay> Bridge<B, D> {
    /// Bridge with a custom settle strategy
    pub fn with_delay(delay: D) -> Self {
        Self {
            chip: OpmChip::with_delay(delay),
        }
    }

    /// Create the engine; a second call keeps the existing one
    pub fn initialize(&mut self) -> Result<()> {
        rejected("initialize", self.chip.create())
    }

    /// Write one register, both arguments in 0-255
    pub fn write_register(&mut self, address: i64, data: i64) -> Result<()> {
        rejected("write_register", self.chip.write_register_checked(address, data))
    }

    /// Clock once and return the raw `[left, right]` pair
    pub fn clock_chip(&mut self) -> Result<[i32; 2]> {
        rejected("clock_chip", self.chip.clock().map(|frame| frame.to_array()))
    }

    /// Reset the engine in place
    pub fn reset_chip(&mut self) -> Result<()> {
        rejected("reset_chip", self.chip.reset())
    }

    /// Release the engine; harmless when none exists
    pub fn cleanup_chip(&mut self) {
        self.chip.destroy();
    }

    /// Whether an engine currently exists
    pub fn is_initialized(&self) -> bool {
        self.chip.is_initialized()
    }

    /// Underlying chip owner
    pub fn chip(&self) -> &OpmChip<B, D> {
        &self.chip
    }

    /// Mutable access for rendering or voice programming
    pub fn chip_mut(&mut self) -> &mut OpmChip<B, D> {
        &mut self.chip
    }
}

fn rejected<T>(op: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        warn!(op, error = %e, "bridge call rejected");
    }
    result
}

/// Thread-safe handle to one [`Bridge`]
///
/// Clones share the same engine. Every call holds the lock for its whole
/// duration, including the settle delay of a register write.
pub struct SharedBridge<B: OpmBackend, D: SettleDelay = BlockingDelay> {
    inner: Arc<Mutex<Bridge<B, D>>>,
}

impl<B: OpmBackend, D: SettleDelay> Clone for SharedBridge<B, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: OpmBackend> SharedBridge<B, BlockingDelay> {
    /// Shared bridge with no engine yet
    pub fn new() -> Self {
        Self::from_bridge(Bridge::new())
    }
}

impl<B: OpmBackend> Default for SharedBridge<B, BlockingDelay> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: OpmBackend, D: SettleDelay> SharedBridge<B, D> {
    /// Share an existing bridge
    pub fn from_bridge(bridge: Bridge<B, D>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(bridge)),
        }
    }

    /// See [`Bridge::initialize`]
    pub fn initialize(&self) -> Result<()> {
        self.inner.lock().initialize()
    }

    /// See [`Bridge::write_register`]
    pub fn write_register(&self, address: i64, data: i64) -> Result<()> {
        self.inner.lock().write_register(address, data)
    }

    /// See [`Bridge::clock_chip`]
    pub fn clock_chip(&self) -> Result<[i32; 2]> {
        self.inner.lock().clock_chip()
    }

    /// See [`Bridge::reset_chip`]
    pub fn reset_chip(&self) -> Result<()> {
        self.inner.lock().reset_chip()
    }

    /// See [`Bridge::cleanup_chip`]
    pub fn cleanup_chip(&self) {
        self.inner.lock().cleanup_chip()
    }

    /// Whether an engine currently exists
    pub fn is_initialized(&self) -> bool {
        self.inner.lock().is_initialized()
    }

    /// Run `f` with exclusive access to the bridge
    pub fn with<R>(&self, f: impl FnOnce(&mut Bridge<B, D>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
