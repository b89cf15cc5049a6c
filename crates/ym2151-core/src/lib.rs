//! YM2151 (OPM) register driver and PCM renderer
//!
//! Drives a YM2151 FM engine through its two-phase register bus, derives
//! key-code/fnum pitch registers from a target frequency, renders the engine's
//! native 55,930 Hz stereo output into 16-bit PCM and writes it to a fixed
//! 44-byte-header WAV container.
//!
//! The engine itself is opaque: anything implementing [`OpmBackend`] can be
//! driven (the `ym2151-softsynth` crate ships a reference implementation).
//!
//! # Features
//! - Engine lifecycle (create / reset / destroy) behind [`OpmChip`]
//! - Address-then-data register writes with the mandatory 10 ms settle delay
//! - Injectable delay strategy ([`BlockingDelay`], [`NoDelay`], [`VirtualClock`])
//! - Named register map and pitch encoder for single-voice tones
//! - Sample-accurate renderer with progress reporting and cancellation
//! - Control [`Bridge`] exposing raw register and clock operations
//!
//! # Quick start
//! ```no_run
//! # fn demo<B: ym2151::OpmBackend>() -> ym2151::Result<()> {
//! use ym2151::{configure_voice, render, write_wav, OpmChip, VoicePatch};
//!
//! let mut chip: OpmChip<B> = OpmChip::new();
//! chip.create()?;
//! configure_voice(&mut chip, 0, 440.0, &VoicePatch::default())?;
//! let pcm = render(&mut chip, 3.0)?;
//! write_wav("output.wav", 55_930, 2, 16, pcm.samples())?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod backend; // Engine contract
pub mod bridge; // Call-level control surface
pub mod chip; // Engine owner + register protocol
pub mod constants;
pub mod export; // Audio container output
pub mod pitch; // Frequency -> register encoding
pub mod registers; // Register map
pub mod render; // Frame loop
pub mod timing; // Settle delay strategies

use std::path::PathBuf;

/// Error types for YM2151 driver operations
#[derive(thiserror::Error, Debug)]
pub enum Ym2151Error {
    /// An operation needing an engine instance ran before `create()` or after `destroy()`
    #[error("Chip not initialized. Call initialize first.")]
    Uninitialized,

    /// Numeric argument outside its allowed range, or not numeric at all
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Engine or sample buffer memory could not be obtained
    #[error("Allocation failed: {0}")]
    Allocation(String),

    /// Output path could not be created for writing
    #[error("Could not open output file {}: {source}", path.display())]
    FileOpen {
        /// Path that failed to open
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// IO error while writing an already opened file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Render stopped through its cancellation flag
    #[error("Render cancelled after {frames_rendered} frames")]
    Cancelled {
        /// Frames completed before the flag was observed
        frames_rendered: usize,
    },
}

impl Ym2151Error {
    /// Shorthand for [`Ym2151Error::InvalidArgument`]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Ym2151Error::InvalidArgument(msg.into())
    }
}

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, Ym2151Error>;

// Public API exports
pub use backend::{BusLane, OpmBackend, StereoFrame};
pub use bridge::{Bridge, SharedBridge};
pub use chip::OpmChip;
pub use constants::{NATIVE_SAMPLE_RATE, OPM_CLOCK_HZ, SETTLE_DELAY};
pub use export::{write_wav, write_wav_to, WavFile, WavHeader};
pub use pitch::{configure_voice, voice_program, PitchParams, VoicePatch};
pub use registers::{OperatorMask, Register, RegisterWrite};
pub use render::{render, render_frames, PcmBuffer, RenderConfig, Renderer};
pub use timing::{BlockingDelay, NoDelay, SettleDelay, VirtualClock};
