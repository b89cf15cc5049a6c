use tracing::trace;
use ym2151::constants::NATIVE_SAMPLE_RATE;
use ym2151::{OperatorMask, Register};

use crate::tables::{DETUNE, ENV_INCREMENT, EXP, LOG_SINE, NOTE_SEMITONE};

const PHASE_BITS: u32 = 20;
const PHASE_MASK: u32 = (1 << PHASE_BITS) - 1;

/// Envelope attenuation at which an operator is inaudible
const ENV_SILENT: u16 = 0x3FF;

const NUM_CHANNELS: usize = 8;
const NUM_SLOTS: usize = 32;

/// Key-on operator bit and the first slot of its group
///
/// Slots are grouped M1 (0-7), M2 (8-15), C1 (16-23), C2 (24-31).
const KEY_ON_GROUPS: [(OperatorMask, usize); 4] = [
    (OperatorMask::M1, 0),
    (OperatorMask::C1, 16),
    (OperatorMask::M2, 8),
    (OperatorMask::C2, 24),
];

/// Register of `family` at a channel or slot offset
fn reg(regs: &[u8; 256], family: Register, offset: usize) -> u8 {
    regs[family.base() as usize + offset]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvPhase {
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Envelope registers of one slot, unpacked
#[derive(Debug, Clone, Copy)]
struct EnvelopeParams {
    attack_rate: u8,
    first_decay_rate: u8,
    second_decay_rate: u8,
    release_rate: u8,
    first_decay_level: u8,
    key_scale: u8,
}

impl EnvelopeParams {
    fn from_registers(regs: &[u8; 256], slot: usize) -> Self {
        let ks_ar = reg(regs, Register::KsAr, slot);
        let d1l_rr = reg(regs, Register::D1lRr, slot);
        Self {
            attack_rate: ks_ar & 0x1F,
            key_scale: ks_ar >> 6,
            first_decay_rate: reg(regs, Register::AmsD1r, slot) & 0x1F,
            second_decay_rate: reg(regs, Register::Dt2D2r, slot) & 0x1F,
            first_decay_level: d1l_rr >> 4,
            release_rate: d1l_rr & 0x0F,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Operator {
    /// 20-bit phase accumulator
    phase: u32,
    increment: u32,
    env_phase: EnvPhase,
    /// 10-bit attenuation, 0 = full volume
    env_level: u16,
    key_on: bool,
    /// Last two outputs, kept for M1 self-feedback
    out: i16,
    prev_out: i16,
}

impl Operator {
    const fn new() -> Self {
        Self {
            phase: 0,
            increment: 0,
            env_phase: EnvPhase::Release,
            env_level: ENV_SILENT,
            key_on: false,
            out: 0,
            prev_out: 0,
        }
    }

    fn set_key_on(&mut self, on: bool) {
        if on == self.key_on {
            return;
        }
        self.key_on = on;
        if on {
            self.phase = 0;
            self.env_phase = EnvPhase::Attack;
        } else {
            self.env_phase = EnvPhase::Release;
        }
    }

    #[inline]
    fn clock_phase(&mut self) {
        self.phase = (self.phase + self.increment) & PHASE_MASK;
    }

    fn clock_envelope(&mut self, params: &EnvelopeParams, key_code: u8, counter: u16) {
        let base_rate = match self.env_phase {
            EnvPhase::Attack => params.attack_rate,
            EnvPhase::Decay => params.first_decay_rate,
            EnvPhase::Sustain => params.second_decay_rate,
            // 4-bit release rate maps onto the 5-bit scale
            EnvPhase::Release => (params.release_rate << 1) | 1,
        };
        let rks = key_code >> (3 - params.key_scale);
        let rate = if base_rate == 0 {
            0
        } else {
            (base_rate as u16 * 2 + rks as u16).min(63) as u8
        };

        let shift = 11u8.saturating_sub(rate / 4);
        let due = rate >= 48 || counter & ((1u16 << shift) - 1) == 0;
        if due {
            let step = ((counter >> shift) & 7) as usize;
            let increment = ENV_INCREMENT[rate as usize][step];
            if increment > 0 {
                match self.env_phase {
                    EnvPhase::Attack if rate >= 62 => self.env_level = 0,
                    EnvPhase::Attack => {
                        // Exponential approach: A' = A + ((I * -(A + 1)) >> 4)
                        let delta = (increment as i32 * -(self.env_level as i32 + 1)) >> 4;
                        self.env_level = (self.env_level as i32 + delta).max(0) as u16;
                    }
                    _ => self.env_level = (self.env_level + increment as u16).min(ENV_SILENT),
                }
            }
        }

        if self.env_phase == EnvPhase::Attack && self.env_level == 0 {
            self.env_phase = EnvPhase::Decay;
        }
        if self.env_phase == EnvPhase::Decay {
            let level = match params.first_decay_level {
                15 => 0x1F,
                d1l => d1l as u16,
            };
            if self.env_level >= level << 5 {
                self.env_phase = EnvPhase::Sustain;
            }
        }
    }

    /// Signed 14-bit output for a phase modulation in 10-bit phase units
    fn output(&self, modulation: i32, total_level: u8) -> i16 {
        let attenuation = (self.env_level + ((total_level as u16) << 3)).min(ENV_SILENT);

        let phase = ((self.phase >> 10) as i32 + modulation) as u32 & 0x3FF;
        let negative = phase & 0x200 != 0;
        let index = if phase & 0x100 == 0 {
            phase & 0xFF
        } else {
            !phase & 0xFF
        };

        // 5.8 fixed point: log-sine plus envelope scaled from 4.6
        let level = LOG_SINE[index as usize] as u32 + ((attenuation as u32) << 2);
        let shift = level >> 8;
        if shift >= 13 {
            return 0;
        }
        let linear = ((EXP[(level & 0xFF) as usize] << 2) >> shift) as i16;
        if negative {
            -linear
        } else {
            linear
        }
    }
}

/// Phase increment per output frame for one slot
fn phase_increment(key_code: u8, key_fraction: u8, dt_mul: u8) -> u32 {
    let block = (key_code >> 4) & 0x07;
    let semitone = NOTE_SEMITONE[(key_code & 0x0F) as usize];
    // Block 0 opens at C#0, MIDI note 13
    let midi = 13.0 + 12.0 * block as f64 + semitone as f64 + key_fraction as f64 / 64.0;
    let hz = 440.0 * 2f64.powf((midi - 69.0) / 12.0);
    let base = hz * (1u32 << PHASE_BITS) as f64 / NATIVE_SAMPLE_RATE as f64;

    let detune = (dt_mul >> 4) & 0x07;
    let delta = DETUNE[((key_code >> 2) & 0x1F) as usize][(detune & 0x03) as usize] as f64;
    let detuned = if detune & 0x04 != 0 {
        (base - delta).max(0.0)
    } else {
        base + delta
    };

    let multiple = match dt_mul & 0x0F {
        0 => 0.5,
        mul => mul as f64,
    };
    ((detuned * multiple).round() as u32) & PHASE_MASK
}

/// Reference YM2151 FM engine
///
/// Four operators per channel, eight connection algorithms, M1 self-feedback
/// and per-channel left/right gating. Output runs at the native frame rate;
/// each channel contributes its 14-bit output at twice PCM scale.
///
/// Not modelled: LFO, noise, timers, DT2 and the CSM mode. Their registers
/// are stored but have no effect.
#[derive(Debug, Clone)]
pub struct SoftOpm {
    registers: [u8; 256],
    address: u8,
    operators: [Operator; NUM_SLOTS],
    env_counter: u16,
}

impl SoftOpm {
    /// Engine in its power-on state: registers zero, all operators released
    pub fn new() -> Self {
        Self {
            registers: [0; 256],
            address: 0,
            operators: [Operator::new(); NUM_SLOTS],
            env_counter: 0,
        }
    }

    /// Return to the power-on state
    pub fn reset(&mut self) {
        *self = SoftOpm::new();
    }

    /// Latch the register address for the next data write
    pub fn write_address(&mut self, address: u8) {
        self.address = address;
    }

    /// Store `value` at the latched address
    pub fn write_data(&mut self, value: u8) {
        let address = self.address;
        self.registers[address as usize] = value;
        match Register::from_addr(address) {
            Some(Register::KeyOn) => self.key_on(value),
            Some(Register::KeyCode | Register::KeyFraction) => {
                self.update_channel_pitch((address & 0x07) as usize)
            }
            Some(Register::DtMul) => {
                self.update_increment((address - Register::DtMul.base()) as usize)
            }
            _ => {}
        }
    }

    /// Address write followed by data write
    pub fn write_register(&mut self, address: u8, value: u8) {
        self.write_address(address);
        self.write_data(value);
    }

    /// Current content of a register
    pub fn register(&self, address: u8) -> u8 {
        self.registers[address as usize]
    }

    /// Whether the operator in `slot` (0-31) is keyed on
    pub fn is_key_on(&self, slot: usize) -> bool {
        self.operators.get(slot).is_some_and(|op| op.key_on)
    }

    /// Advance one frame and return the raw left/right output
    pub fn generate(&mut self) -> (i32, i32) {
        for (slot, op) in self.operators.iter_mut().enumerate() {
            let key_code = (reg(&self.registers, Register::KeyCode, slot & 0x07) >> 2) & 0x1F;
            let params = EnvelopeParams::from_registers(&self.registers, slot);
            op.clock_phase();
            op.clock_envelope(&params, key_code, self.env_counter);
        }
        self.env_counter = self.env_counter.wrapping_add(1);

        let mut left = 0i32;
        let mut right = 0i32;
        for channel in 0..NUM_CHANNELS {
            let out = self.channel_output(channel) as i32 * 2;
            let rl = reg(&self.registers, Register::RlFbConnect, channel);
            if rl & 0x40 != 0 {
                left += out;
            }
            if rl & 0x80 != 0 {
                right += out;
            }
        }
        (left, right)
    }

    fn key_on(&mut self, value: u8) {
        let channel = (value & 0x07) as usize;
        let mask = OperatorMask::from_bits_truncate(value);
        trace!(channel, operators = mask.bits() >> 3, "key on/off");
        for (operator, group) in KEY_ON_GROUPS {
            self.operators[group + channel].set_key_on(mask.contains(operator));
        }
    }

    fn update_channel_pitch(&mut self, channel: usize) {
        for (_, group) in KEY_ON_GROUPS {
            self.update_increment(group + channel);
        }
    }

    fn update_increment(&mut self, slot: usize) {
        let channel = slot & 0x07;
        let key_code = reg(&self.registers, Register::KeyCode, channel);
        let key_fraction = reg(&self.registers, Register::KeyFraction, channel) >> 2;
        let dt_mul = reg(&self.registers, Register::DtMul, slot);
        self.operators[slot].increment = phase_increment(key_code, key_fraction, dt_mul);
    }

    fn channel_output(&mut self, channel: usize) -> i16 {
        let connect = reg(&self.registers, Register::RlFbConnect, channel);
        let algorithm = connect & 0x07;
        let feedback = (connect >> 3) & 0x07;
        let (m1, m2, c1, c2) = (channel, channel + 8, channel + 16, channel + 24);
        let tl = [m1, c1, m2, c2].map(|slot| {
            reg(&self.registers, Register::TotalLevel, slot) & 0x7F
        });

        let ops = &self.operators;
        let fb = if feedback > 0 {
            (ops[m1].out as i32 + ops[m1].prev_out as i32) >> (10 - feedback)
        } else {
            0
        };
        let m1_out = ops[m1].output(fb, tl[0]) as i32;
        let out = |slot: usize, modulation: i32, level: u8| {
            ops[slot].output(modulation >> 1, level) as i32
        };

        // Operator order M1, C1, M2, C2
        let sum = match algorithm {
            0 => {
                let c1_out = out(c1, m1_out, tl[1]);
                let m2_out = out(m2, c1_out, tl[2]);
                out(c2, m2_out, tl[3])
            }
            1 => {
                let c1_out = out(c1, 0, tl[1]);
                let m2_out = out(m2, m1_out + c1_out, tl[2]);
                out(c2, m2_out, tl[3])
            }
            2 => {
                let c1_out = out(c1, 0, tl[1]);
                let m2_out = out(m2, c1_out, tl[2]);
                out(c2, m1_out + m2_out, tl[3])
            }
            3 => {
                let c1_out = out(c1, m1_out, tl[1]);
                let m2_out = out(m2, 0, tl[2]);
                out(c2, c1_out + m2_out, tl[3])
            }
            4 => {
                let c1_out = out(c1, m1_out, tl[1]);
                let m2_out = out(m2, 0, tl[2]);
                c1_out + out(c2, m2_out, tl[3])
            }
            5 => out(c1, m1_out, tl[1]) + out(m2, m1_out, tl[2]) + out(c2, m1_out, tl[3]),
            6 => out(c1, m1_out, tl[1]) + out(m2, 0, tl[2]) + out(c2, 0, tl[3]),
            _ => m1_out + out(c1, 0, tl[1]) + out(m2, 0, tl[2]) + out(c2, 0, tl[3]),
        };

        let op = &mut self.operators[m1];
        op.prev_out = op.out;
        op.out = m1_out as i16;
        sum.clamp(-8192, 8191) as i16
    }
}

impl Default for SoftOpm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// M1 alone as a carrier on channel 0, A4, both outputs
    const SINE_A4: [(u8, u8); 8] = [
        (0x20, 0xC7),
        (0x40, 0x01),
        (0x60, 0x00),
        (0x80, 0x1F),
        (0xE0, 0x0F),
        (0x28, 0x4A),
        (0x30, 0x00),
        (0x08, 0x08),
    ];

    fn programmed(writes: &[(u8, u8)]) -> SoftOpm {
        let mut engine = SoftOpm::new();
        for &(address, value) in writes {
            engine.write_register(address, value);
        }
        engine
    }

    fn left_channel(engine: &mut SoftOpm, frames: usize) -> Vec<i32> {
        (0..frames).map(|_| engine.generate().0).collect()
    }

    fn rising_crossings(samples: &[i32]) -> usize {
        samples.windows(2).filter(|w| w[0] < 0 && w[1] > 0).count()
    }

    #[test]
    fn test_power_on_is_silent() {
        let mut engine = SoftOpm::new();
        assert!((0..2000).all(|_| engine.generate() == (0, 0)));
    }

    #[test]
    fn test_reset_clears_registers_and_keys() {
        let mut engine = programmed(&SINE_A4);
        assert!(engine.is_key_on(0));
        engine.reset();
        assert!(!engine.is_key_on(0));
        assert_eq!(engine.register(0x20), 0);
        assert_eq!(engine.generate(), (0, 0));
    }

    #[test]
    fn test_key_on_slot_mapping() {
        let engine = programmed(&[(0x08, 0x7B)]);
        for slot in [3, 11, 19, 27] {
            assert!(engine.is_key_on(slot), "slot {slot}");
        }
        assert!(!engine.is_key_on(0));
        assert!(!engine.is_key_on(32));

        // C1 only: bit 4 addresses the third slot group
        let engine = programmed(&[(0x08, 0x12)]);
        assert!(engine.is_key_on(18));
        assert!(!engine.is_key_on(10));
    }

    #[test]
    fn test_reference_patch_is_gated_silent() {
        // RL = 0 disables both outputs even though M1 is sounding internally
        let mut engine = programmed(&[
            (0x40, 0x01),
            (0x60, 0x00),
            (0x80, 0x1F),
            (0xA0, 0x00),
            (0xC0, 0x00),
            (0xE0, 0x0F),
            (0x20, 0x00),
            (0x28, 0x4A),
            (0x30, 0x00),
            (0x08, 0x78),
        ]);
        assert!((0..5000).all(|_| engine.generate() == (0, 0)));
        assert_eq!(engine.operators[0].env_level, 0);
    }

    #[test]
    fn test_sine_is_audible_on_both_sides() {
        let mut engine = programmed(&SINE_A4);
        let frames: Vec<(i32, i32)> = (0..2000).map(|_| engine.generate()).collect();
        assert!(frames.iter().all(|(l, r)| l == r));
        let peak = frames.iter().map(|(l, _)| l.abs()).max().unwrap();
        assert!(peak > 10_000, "peak {peak}");
        assert!(peak <= 16_382);
    }

    #[test]
    fn test_sine_pitch() {
        let mut engine = programmed(&SINE_A4);
        let samples = left_channel(&mut engine, NATIVE_SAMPLE_RATE as usize);
        let cycles = rising_crossings(&samples);
        assert!((438..=441).contains(&cycles), "{cycles} cycles");
    }

    #[test]
    fn test_multiplier_doubles_pitch() {
        let mut engine = programmed(&SINE_A4);
        engine.write_register(0x40, 0x02);
        let samples = left_channel(&mut engine, NATIVE_SAMPLE_RATE as usize);
        let cycles = rising_crossings(&samples);
        assert!((877..=881).contains(&cycles), "{cycles} cycles");
    }

    #[test]
    fn test_right_only_output() {
        let mut engine = programmed(&SINE_A4);
        engine.write_register(0x20, 0x87);
        let frames: Vec<(i32, i32)> = (0..1000).map(|_| engine.generate()).collect();
        assert!(frames.iter().all(|&(l, _)| l == 0));
        assert!(frames.iter().any(|&(_, r)| r != 0));
    }

    #[test]
    fn test_key_off_releases_to_silence() {
        let mut engine = programmed(&SINE_A4);
        left_channel(&mut engine, 500);
        engine.write_register(0x08, 0x00);
        let tail = left_channel(&mut engine, 2000);
        assert!(tail[1500..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_zero_attack_rate_never_sounds() {
        let mut engine = programmed(&SINE_A4);
        engine.reset();
        for &(address, value) in &SINE_A4 {
            let value = if address == 0x80 { 0x00 } else { value };
            engine.write_register(address, value);
        }
        assert!(left_channel(&mut engine, 2000).iter().all(|&s| s == 0));
    }

    #[test]
    fn test_feedback_changes_waveform() {
        let mut plain = programmed(&SINE_A4);
        let mut fed = programmed(&SINE_A4);
        fed.write_register(0x20, 0xC7 | (6 << 3));
        assert_ne!(left_channel(&mut plain, 500), left_channel(&mut fed, 500));
    }

    #[test]
    fn test_modulator_chain_changes_waveform() {
        // Plain C2 against C2 phase-modulated by M2
        let carrier = [
            (0x20, 0xC0),
            (0x58, 0x01),
            (0x98, 0x1F),
            (0xF8, 0x0F),
            (0x28, 0x4A),
            (0x08, 0x40),
        ];
        let mut plain = programmed(&carrier);
        let mut modulated = programmed(&carrier);
        modulated.write_register(0x20, 0xC4); // algorithm 4: M1 -> C1, M2 -> C2
        modulated.write_register(0x48, 0x01); // M2 mul
        modulated.write_register(0x88, 0x1F); // M2 attack
        modulated.write_register(0x08, 0x60); // key M2 + C2
        let a = left_channel(&mut plain, 1000);
        let b = left_channel(&mut modulated, 1000);
        assert!(a.iter().any(|&s| s != 0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let mut a = programmed(&SINE_A4);
        let mut b = programmed(&SINE_A4);
        a.write_register(0x20, 0xC7 | (5 << 3));
        b.write_register(0x20, 0xC7 | (5 << 3));
        assert_eq!(left_channel(&mut a, 3000), left_channel(&mut b, 3000));
    }

    #[test]
    fn test_named_registers_drive_channel_seven() {
        let mut engine = SoftOpm::new();
        let writes = [
            (Register::RlFbConnect, 7, 0xC7),
            (Register::DtMul, 7, 0x01),
            (Register::KsAr, 7, 0x1F),
            (Register::D1lRr, 7, 0x0F),
            (Register::KeyCode, 7, 0x4A),
        ];
        for (family, offset, value) in writes {
            engine.write_register(family.addr(offset).unwrap(), value);
        }
        assert_eq!(engine.operators[7].increment, phase_increment(0x4A, 0, 0x01));

        engine.write_register(Register::KeyFraction.addr(7).unwrap(), 32 << 2);
        assert_eq!(engine.operators[7].increment, phase_increment(0x4A, 32, 0x01));
        assert_eq!(engine.operators[0].increment, 0);

        engine.write_register(Register::KeyOn.base(), OperatorMask::M1.key_on_value(7));
        assert!(engine.is_key_on(7));
        assert!(!engine.is_key_on(23));
        let samples = left_channel(&mut engine, 2000);
        assert!(samples.iter().any(|&s| s != 0));
    }

    #[test]
    fn test_key_on_ignores_channel_and_spare_bits() {
        let engine = programmed(&[(0x08, 0x80 | OperatorMask::C2.key_on_value(5))]);
        assert!(engine.is_key_on(29));
        assert_eq!((0..32).filter(|&slot| engine.is_key_on(slot)).count(), 1);
    }

    #[test]
    fn test_increment_follows_key_code() {
        let a4 = phase_increment(0x4A, 0, 0x01);
        let a5 = phase_increment(0x5A, 0, 0x01);
        assert_eq!(a5, a4 * 2);
        assert_eq!(phase_increment(0x4A, 0, 0x00), (a4 + 1) / 2);
        assert!(phase_increment(0x4A, 32, 0x01) > a4);
    }
}
