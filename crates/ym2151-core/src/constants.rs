//! YM2151 Hardware Constants
//!
//! Clock, output rate and bus timing shared by the driver components.

use std::time::Duration;

/// YM2151 master clock (NTSC colorburst, 3.579545 MHz)
pub const OPM_CLOCK_HZ: u32 = 3_579_545;

/// Native output rate of the engine in stereo frames per second
///
/// One frame every 64 master clocks (3_579_545 / 64 = 55_930.4). The fractional
/// part is dropped; the rate is fixed and not configurable.
pub const NATIVE_SAMPLE_RATE: u32 = 55_930;

/// Mandatory wait after every register write and reset
pub const SETTLE_DELAY: Duration = Duration::from_millis(10);

/// Number of FM channels
pub const NUM_CHANNELS: u8 = 8;

/// Number of operator slots (4 per channel)
pub const NUM_SLOTS: u8 = 32;

/// Highest octave/block value
pub const MAX_BLOCK: u8 = 7;

/// fnum is an 11-bit field
pub const FNUM_MAX: u16 = 0x7FF;

/// Denominator of the pitch formula: 64 clocks per sample * 144
pub const PITCH_DIVISOR: f64 = 64.0 * 144.0;

/// Output channel count of the render path
pub const OUTPUT_CHANNELS: u16 = 2;

/// Output bit depth of the render path
pub const OUTPUT_BITS_PER_SAMPLE: u16 = 16;

/// Size of the fixed RIFF/WAVE header
pub const WAV_HEADER_LEN: usize = 44;

/// Length of the standalone render
pub const REFERENCE_DURATION_SECONDS: f64 = 3.0;

/// Pitch of the standalone render
pub const REFERENCE_FREQUENCY_HZ: f64 = 440.0;

/// Base frequency unit of the pitch formula (clock / (64 * 144))
#[inline]
pub fn pitch_base_hz() -> f64 {
    OPM_CLOCK_HZ as f64 / PITCH_DIVISOR
}
