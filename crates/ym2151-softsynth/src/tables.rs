//! Lookup tables for the operator and envelope generators

use std::sync::LazyLock;

/// Quarter-wave log-sine: -log2(sin(x)) in 4.8 fixed point
pub(crate) static LOG_SINE: LazyLock<[u16; 256]> = LazyLock::new(|| {
    std::array::from_fn(|i| {
        let phase = (2 * i + 1) as f64 / 512.0 * std::f64::consts::FRAC_PI_2;
        (-phase.sin().log2() * 256.0).round() as u16
    })
});

/// 2^x for the fractional part of an attenuation, 11-bit output
pub(crate) static EXP: LazyLock<[u16; 256]> = LazyLock::new(|| {
    std::array::from_fn(|i| {
        let value = 2f64.powf((255 - i) as f64 / 256.0);
        ((value * 1024.0).round() as u16) | 0x400
    })
});

/// DT1 phase increment deltas indexed by [key code][detune magnitude]
#[rustfmt::skip]
pub(crate) const DETUNE: [[u8; 4]; 32] = [
    [0, 0, 1, 2], [0, 0, 1, 2], [0, 0, 1, 2], [0, 0, 1, 2],
    [0, 1, 2, 2], [0, 1, 2, 3], [0, 1, 2, 3], [0, 1, 2, 3],
    [0, 1, 2, 4], [0, 1, 3, 4], [0, 1, 3, 4], [0, 1, 3, 5],
    [0, 2, 4, 5], [0, 2, 4, 6], [0, 2, 4, 6], [0, 2, 5, 7],
    [0, 2, 5, 8], [0, 3, 6, 8], [0, 3, 6, 9], [0, 3, 7, 10],
    [0, 4, 8, 11], [0, 4, 8, 12], [0, 4, 9, 13], [0, 5, 10, 14],
    [0, 5, 11, 16], [0, 6, 12, 17], [0, 6, 13, 19], [0, 7, 14, 20],
    [0, 8, 16, 22], [0, 8, 16, 22], [0, 8, 16, 22], [0, 8, 16, 22],
];

/// Envelope step patterns for the low rates, selected by rate % 4
const SLOW_STEPS: [[u8; 8]; 4] = [
    [0, 1, 0, 1, 0, 1, 0, 1],
    [0, 1, 0, 1, 1, 1, 0, 1],
    [0, 1, 1, 1, 0, 1, 1, 1],
    [0, 1, 1, 1, 1, 1, 1, 1],
];

/// Envelope step patterns for rates 48-59 before octave scaling
const FAST_STEPS: [[u8; 8]; 4] = [
    [1, 1, 1, 1, 1, 1, 1, 1],
    [1, 1, 1, 2, 1, 1, 1, 2],
    [1, 2, 1, 2, 1, 2, 1, 2],
    [1, 2, 2, 2, 1, 2, 2, 2],
];

/// Envelope increment per update, indexed by [rate][cycle step]
pub(crate) static ENV_INCREMENT: LazyLock<[[u8; 8]; 64]> = LazyLock::new(|| {
    std::array::from_fn(|rate| match rate {
        0 | 1 => [0; 8],
        2..=47 => SLOW_STEPS[rate % 4],
        48..=59 => FAST_STEPS[rate % 4].map(|step| step << ((rate - 48) / 4)),
        _ => [8; 8],
    })
});

/// Semitone above C# for each 4-bit note code; unused codes repeat their neighbour
pub(crate) const NOTE_SEMITONE: [u8; 16] = [0, 1, 2, 2, 3, 4, 5, 5, 6, 7, 8, 8, 9, 10, 11, 11];
