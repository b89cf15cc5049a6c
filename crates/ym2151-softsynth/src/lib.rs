//! Reference FM Engine Backend for YM2151
//!
//! This crate provides a compact four-operator FM engine that implements the
//! [`OpmBackend`] trait. It follows the OPM register map closely enough to
//! render voices programmed through the `ym2151` driver, without aiming for
//! bit-exact output.
//!
//! # Features
//!
//! - Address latch and 256-byte register file
//! - Key code / key fraction pitch with DT1 and MUL
//! - Attack, first decay, second decay and release envelopes with key scaling
//! - All eight connection algorithms and M1 self-feedback
//! - Per-channel left/right output enables
//!
//! # Example
//!
//! ```no_run
//! use ym2151::{configure_voice, render, OpmChip, VoicePatch};
//! use ym2151_softsynth::SoftOpm;
//!
//! # fn main() -> ym2151::Result<()> {
//! let mut chip: OpmChip<SoftOpm> = OpmChip::new();
//! chip.create()?;
//! // Both outputs on, algorithm 7 so the programmed operator is a carrier
//! let patch = VoicePatch { rl_fb_connect: 0xC7, ..VoicePatch::default() };
//! configure_voice(&mut chip, 0, 440.0, &patch)?;
//! let pcm = render(&mut chip, 1.0)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub use ym2151::OpmBackend;
use ym2151::{BusLane, StereoFrame};

mod softsynth_impl;
mod tables;

pub use softsynth_impl::SoftOpm;

impl OpmBackend for SoftOpm {
    fn new() -> Self {
        SoftOpm::new()
    }

    fn reset(&mut self) {
        SoftOpm::reset(self);
    }

    fn write_port(&mut self, lane: BusLane, value: u8) {
        match lane {
            BusLane::Address => self.write_address(value),
            BusLane::Data => self.write_data(value),
        }
    }

    fn clock(&mut self) -> StereoFrame {
        let (left, right) = self.generate();
        StereoFrame::new(left, right)
    }
}
