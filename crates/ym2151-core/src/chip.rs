//! Engine ownership and the register write protocol
//!
//! [`OpmChip`] owns at most one engine instance. It creates and resets it,
//! refuses every engine operation while no instance exists, and pushes
//! register writes through the two-phase bus followed by the settle delay.

use tracing::{debug, info};

use crate::backend::{BusLane, OpmBackend, StereoFrame};
use crate::constants::SETTLE_DELAY;
use crate::registers::RegisterWrite;
use crate::timing::{BlockingDelay, SettleDelay};
use crate::{Result, Ym2151Error};

/// Owner of a single YM2151 engine instance
///
/// # Example
///
/// ```no_run
/// # fn demo<B: ym2151::OpmBackend>() -> ym2151::Result<()> {
/// use ym2151::OpmChip;
///
/// let mut chip: OpmChip<B> = OpmChip::new();
/// chip.create()?;
/// chip.write_register(0x08, 0x78)?; // key on, channel 0, all operators
/// let frame = chip.clock()?;
/// chip.destroy();
/// # Ok(())
/// # }
/// ```
pub struct OpmChip<B: OpmBackend, D: SettleDelay = BlockingDelay> {
    engine: Option<Box<B>>,
    delay: D,
    writes_issued: u64,
}

impl<B: OpmBackend> OpmChip<B, BlockingDelay> {
    /// Create an empty owner that sleeps for real after each write
    pub fn new() -> Self {
        Self::with_delay(BlockingDelay)
    }
}

impl<B: OpmBackend> Default for OpmChip<B, BlockingDelay> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: OpmBackend, D: SettleDelay> OpmChip<B, D> {
    /// Create an empty owner with a custom settle strategy
    pub fn with_delay(delay: D) -> Self {
        Self {
            engine: None,
            delay,
            writes_issued: 0,
        }
    }

    /// Allocate, zero-fill and reset the engine
    ///
    /// Does nothing when an instance already exists.
    pub fn create(&mut self) -> Result<()> {
        self.create_with(|| Ok(B::new()))
    }

    /// Like [`OpmChip::create`], with a fallible engine constructor
    ///
    /// The factory is not called when an instance already exists. Its error
    /// (typically [`Ym2151Error::Allocation`]) is returned unchanged and leaves
    /// the owner empty.
    pub fn create_with<F>(&mut self, factory: F) -> Result<()>
    where
        F: FnOnce() -> Result<B>,
    {
        if self.engine.is_some() {
            debug!("engine already present, create is a no-op");
            return Ok(());
        }
        let mut engine = Box::new(factory()?);
        engine.reset();
        self.engine = Some(engine);
        self.writes_issued = 0;
        info!("YM2151 engine created");
        Ok(())
    }

    /// Release the engine; safe to call when none exists
    pub fn destroy(&mut self) {
        if self.engine.take().is_some() {
            info!(writes = self.writes_issued, "YM2151 engine destroyed");
        }
    }

    /// Whether an engine instance currently exists
    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// Re-initialize the engine in place, then wait the settle delay
    pub fn reset(&mut self) -> Result<()> {
        self.engine_mut()?.reset();
        info!("YM2151 engine reset");
        self.delay.settle(SETTLE_DELAY);
        Ok(())
    }

    /// Write `data` to register `address`
    ///
    /// Latches the address on the address lane, stores the value on the data
    /// lane, then blocks for [`SETTLE_DELAY`]. The order and the wait are part
    /// of the contract; nothing is batched.
    pub fn write_register(&mut self, address: u8, data: u8) -> Result<()> {
        let engine = self.engine.as_deref_mut().ok_or(Ym2151Error::Uninitialized)?;
        engine.write_port(BusLane::Address, address);
        engine.write_port(BusLane::Data, data);
        self.writes_issued += 1;
        debug!("register write ${address:02X} <- ${data:02X}");
        self.delay.settle(SETTLE_DELAY);
        Ok(())
    }

    /// Range-checked register write for callers holding wider integers
    ///
    /// The engine must exist; then both values must lie in 0-255.
    pub fn write_register_checked(&mut self, address: i64, data: i64) -> Result<()> {
        if !self.is_initialized() {
            return Err(Ym2151Error::Uninitialized);
        }
        let address = register_byte("address", address)?;
        let data = register_byte("data", data)?;
        self.write_register(address, data)
    }

    /// Issue a prepared write
    pub fn write(&mut self, write: RegisterWrite) -> Result<()> {
        self.write_register(write.address, write.data)
    }

    /// Issue a sequence of writes in order, each with its own settle delay
    pub fn write_all<I>(&mut self, writes: I) -> Result<()>
    where
        I: IntoIterator<Item = RegisterWrite>,
    {
        for write in writes {
            self.write(write)?;
        }
        Ok(())
    }

    /// Clock the engine once and return the raw stereo frame
    #[inline]
    pub fn clock(&mut self) -> Result<StereoFrame> {
        Ok(self.engine_mut()?.clock())
    }

    /// Number of register writes since the engine was created
    pub fn writes_issued(&self) -> u64 {
        self.writes_issued
    }

    /// Settle strategy in use
    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Direct access to the engine, if present
    pub fn engine(&self) -> Option<&B> {
        self.engine.as_deref()
    }

    fn engine_mut(&mut self) -> Result<&mut B> {
        self.engine.as_deref_mut().ok_or(Ym2151Error::Uninitialized)
    }
}

/// Convert a caller-supplied integer into a register byte
pub(crate) fn register_byte(name: &str, value: i64) -> Result<u8> {
    u8::try_from(value)
        .map_err(|_| Ym2151Error::invalid(format!("{name} must be in 0-255, got {value}")))
}
