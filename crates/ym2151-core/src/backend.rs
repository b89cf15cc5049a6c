//! Backend trait abstraction for YM2151 engine implementations
//!
//! The driver never looks inside the engine. Everything it needs is the
//! three-operation contract below: reset, write one byte to a bus lane, and
//! clock out one stereo frame.

/// Bus lane selected by the A0 line of the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BusLane {
    /// Latch a register address
    Address = 0,
    /// Write data to the latched address
    Data = 1,
}

impl BusLane {
    /// Raw A0 value of the lane
    pub fn port(self) -> u8 {
        self as u8
    }
}

/// One stereo frame as produced by a single engine clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StereoFrame {
    /// Left output, engine native scale
    pub left: i32,
    /// Right output, engine native scale
    pub right: i32,
}

impl StereoFrame {
    /// Create a frame from a left/right pair
    pub const fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }

    /// Raw pair as returned by the bridge
    pub fn to_array(self) -> [i32; 2] {
        [self.left, self.right]
    }

    /// Halve both channels (truncating toward zero) and saturate to 16 bits
    #[inline]
    pub fn halved(self) -> [i16; 2] {
        [halve_to_i16(self.left), halve_to_i16(self.right)]
    }
}

impl From<[i32; 2]> for StereoFrame {
    fn from(pair: [i32; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

/// Integer division by two truncates toward zero for negative values too
#[inline]
fn halve_to_i16(value: i32) -> i16 {
    (value / 2).clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Common interface for YM2151 engine backends
///
/// This trait allows different implementations to be used interchangeably:
/// - Bit-exact emulations wrapped from elsewhere
/// - The reference FM engine in `ym2151-softsynth`
/// - Scripted fakes in tests
///
/// # Example
///
/// ```
/// use ym2151::{BusLane, OpmBackend};
///
/// fn key_on_channel_zero<B: OpmBackend>(chip: &mut B) {
///     chip.write_port(BusLane::Address, 0x08);
///     chip.write_port(BusLane::Data, 0x78);
///     let frame = chip.clock();
///     let _ = frame.left;
/// }
/// ```
pub trait OpmBackend: Send {
    /// Create a zero-filled engine instance
    ///
    /// The instance is not considered usable until [`OpmBackend::reset`] ran.
    fn new() -> Self
    where
        Self: Sized;

    /// Re-initialize all internal state without reallocating
    fn reset(&mut self);

    /// Write one byte to the given bus lane
    ///
    /// An address-lane write selects the register, the following data-lane
    /// write stores into it.
    fn write_port(&mut self, lane: BusLane, value: u8);

    /// Advance the engine by one output frame and return it
    fn clock(&mut self) -> StereoFrame;
}
