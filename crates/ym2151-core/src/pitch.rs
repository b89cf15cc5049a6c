//! Pitch encoding and single-voice programming
//!
//! Converts a target frequency into the OPM's native pitch fields and emits
//! the register script that sets up one tone on one channel.
//!
//! Pitch relation used throughout:
//!
//! ```text
//! frequency ≈ (clock / (64 * 144)) * 2^(block - 1) * (fnum / 2048)
//! ```
//!
//! The chip itself is keyed by key code (block + note code) and key fraction;
//! fnum is derived alongside so callers can audit the encoded frequency.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::OpmBackend;
use crate::chip::OpmChip;
use crate::constants::{pitch_base_hz, FNUM_MAX, MAX_BLOCK, NUM_CHANNELS};
use crate::registers::{OperatorMask, Register, RegisterWrite};
use crate::timing::SettleDelay;
use crate::{Result, Ym2151Error};

/// OPM note codes for the twelve semitones of an octave, starting at C#
///
/// Codes 3, 7, 11 and 15 are unused by the chip.
pub const NOTE_CODES: [u8; 12] = [0, 1, 2, 4, 5, 6, 8, 9, 10, 12, 13, 14];

/// MIDI note number of A4
const A4_MIDI: f64 = 69.0;

/// Tolerance so exact semitones do not fall to the note below through rounding
const SEMITONE_EPSILON: f64 = 1e-9;

/// Pitch fields for one configured voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchParams {
    /// Channel index (0-7)
    pub channel: u8,
    /// Primary operator slot (channel * 4)
    pub slot: u8,
    /// Octave / block (0-7)
    pub block: u8,
    /// 11-bit fractional tone number
    pub fnum: u16,
    /// Block in the high nibble, note code in the low nibble
    pub key_code: u8,
    /// Key fraction register value (fraction in bits 7-2)
    pub key_fraction: u8,
    /// Key-on register value enabling all four operators of the channel
    pub key_on: u8,
}

impl PitchParams {
    /// Derive pitch fields for `frequency_hz` on `channel`
    ///
    /// Deterministic: identical inputs always yield identical fields. The
    /// block is the octave of the note at or below the frequency (octaves run
    /// C#..C as on the chip), the key fraction holds the remaining part of a
    /// semitone in 1/64 steps, and fnum is rounded to the nearest integer.
    pub fn for_frequency(channel: u8, frequency_hz: f64) -> Result<Self> {
        if channel >= NUM_CHANNELS {
            return Err(Ym2151Error::invalid(format!(
                "channel must be in 0-{}, got {channel}",
                NUM_CHANNELS - 1
            )));
        }
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(Ym2151Error::invalid(format!(
                "frequency must be a positive number, got {frequency_hz}"
            )));
        }

        // Semitones counted from the C# that opens octave -1
        let semitones = A4_MIDI + 12.0 * (frequency_hz / 440.0).log2() - 1.0;
        let mut note = (semitones + SEMITONE_EPSILON).floor();
        let mut fraction = ((semitones - note).max(0.0) * 64.0).round() as u8;
        if fraction >= 64 {
            note += 1.0;
            fraction = 0;
        }

        let note = note as i64;
        let octave = note.div_euclid(12) - 1;
        if !(0..=MAX_BLOCK as i64).contains(&octave) {
            return Err(Ym2151Error::invalid(format!(
                "frequency {frequency_hz} Hz is outside the encodable octaves 0-{MAX_BLOCK}"
            )));
        }
        let block = octave as u8;
        let note_code = NOTE_CODES[note.rem_euclid(12) as usize];

        Ok(Self {
            channel,
            slot: channel * 4,
            block,
            fnum: fnum_for(frequency_hz, block),
            key_code: (block << 4) | note_code,
            key_fraction: fraction << 2,
            key_on: OperatorMask::all().key_on_value(channel),
        })
    }

    /// Frequency encoded by the block/fnum pair
    pub fn frequency(&self) -> f64 {
        pitch_base_hz() * block_scale(self.block) * (self.fnum as f64 / 2048.0)
    }
}

/// `2^(block - 1)`
#[inline]
fn block_scale(block: u8) -> f64 {
    2f64.powi(block as i32 - 1)
}

/// Nearest 11-bit fnum for a frequency at a given block
fn fnum_for(frequency_hz: f64, block: u8) -> u16 {
    let exact = frequency_hz * 2048.0 / (pitch_base_hz() * block_scale(block));
    exact.round().clamp(0.0, FNUM_MAX as f64) as u16
}

/// Operator and channel values written by the voice program
///
/// The default reproduces the reference single-operator tone: multiplier 1,
/// full level, fastest attack, no decay, release rate 15, connection 0 with
/// no feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoicePatch {
    /// DT1/MUL
    pub dt_mul: u8,
    /// Total level (attenuation), 0 = loudest, 127 = silent
    pub total_level: u8,
    /// KS/AR
    pub ks_ar: u8,
    /// AMS-EN/D1R
    pub ams_d1r: u8,
    /// DT2/D2R
    pub dt2_d2r: u8,
    /// D1L/RR
    pub d1l_rr: u8,
    /// RL/FB/CONNECT
    pub rl_fb_connect: u8,
}

impl Default for VoicePatch {
    fn default() -> Self {
        Self {
            dt_mul: 0x01,
            total_level: 0x00,
            ks_ar: 0x1F,
            ams_d1r: 0x00,
            dt2_d2r: 0x00,
            d1l_rr: 0x0F,
            rl_fb_connect: 0x00,
        }
    }
}

/// Register script for one voice, in issue order
///
/// Operator multiplier/detune, total level, attack, first decay, second decay,
/// release, connection/feedback, key code, key fraction, key on.
pub fn voice_program(
    channel: u8,
    frequency_hz: f64,
    patch: &VoicePatch,
) -> Result<(PitchParams, Vec<RegisterWrite>)> {
    let pitch = PitchParams::for_frequency(channel, frequency_hz)?;
    let slot = pitch.slot;
    let writes = vec![
        Register::DtMul.write(slot, patch.dt_mul)?,
        Register::TotalLevel.write(slot, patch.total_level)?,
        Register::KsAr.write(slot, patch.ks_ar)?,
        Register::AmsD1r.write(slot, patch.ams_d1r)?,
        Register::Dt2D2r.write(slot, patch.dt2_d2r)?,
        Register::D1lRr.write(slot, patch.d1l_rr)?,
        Register::RlFbConnect.write(channel, patch.rl_fb_connect)?,
        Register::KeyCode.write(channel, pitch.key_code)?,
        Register::KeyFraction.write(channel, pitch.key_fraction)?,
        Register::KeyOn.write(0, pitch.key_on)?,
    ];
    Ok((pitch, writes))
}

/// Program one voice on `chip` and key it on
///
/// Every write is settled individually, so this takes at least ten settle
/// intervals. Argument errors are reported before anything reaches the chip.
pub fn configure_voice<B, D>(
    chip: &mut OpmChip<B, D>,
    channel: u8,
    frequency_hz: f64,
    patch: &VoicePatch,
) -> Result<PitchParams>
where
    B: OpmBackend,
    D: SettleDelay,
{
    let (pitch, writes) = voice_program(channel, frequency_hz, patch)?;
    if !chip.is_initialized() {
        return Err(Ym2151Error::Uninitialized);
    }
    info!(
        channel,
        frequency_hz,
        block = pitch.block,
        fnum = pitch.fnum,
        key_code = pitch.key_code,
        "configuring voice"
    );
    chip.write_all(writes)?;
    Ok(pitch)
}
