//! Sample-accurate rendering of engine output into 16-bit PCM
//!
//! One engine clock per output frame at the fixed native rate. Each raw
//! channel value is halved (truncating toward zero) and saturated into `i16`,
//! then appended left-then-right. The engine's output at frame *n* depends on
//! every earlier clock, so frames are produced strictly in order and never
//! skipped or recomputed.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::OpmBackend;
use crate::chip::OpmChip;
use crate::constants::{
    NATIVE_SAMPLE_RATE, OUTPUT_BITS_PER_SAMPLE, OUTPUT_CHANNELS, REFERENCE_DURATION_SECONDS,
    REFERENCE_FREQUENCY_HZ,
};
use crate::timing::SettleDelay;
use crate::{Result, Ym2151Error};

/// Render configuration options
///
/// Output format is not configurable: the engine always produces 16-bit stereo
/// at [`NATIVE_SAMPLE_RATE`]. Loading a config that names a rate, channel
/// count or bit depth fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Length of the render in seconds
    pub duration_seconds: f64,
    /// Pitch of the configured voice
    pub frequency_hz: f64,
    /// Channel the voice is programmed on
    pub channel: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::reference()
    }
}

impl RenderConfig {
    /// 3 seconds of A4 on channel 0
    pub fn reference() -> Self {
        Self {
            duration_seconds: REFERENCE_DURATION_SECONDS,
            frequency_hz: REFERENCE_FREQUENCY_HZ,
            channel: 0,
        }
    }

    /// Set the render length
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    /// Set the voice pitch
    pub fn with_frequency(mut self, hz: f64) -> Self {
        self.frequency_hz = hz;
        self
    }

    /// Set the voice channel
    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Output sample rate, always the native rate
    pub fn sample_rate(&self) -> u32 {
        NATIVE_SAMPLE_RATE
    }

    /// Output channel count
    pub fn channels(&self) -> u16 {
        OUTPUT_CHANNELS
    }

    /// Output bit depth
    pub fn bits_per_sample(&self) -> u16 {
        OUTPUT_BITS_PER_SAMPLE
    }

    /// Frames this configuration renders
    pub fn frame_count(&self) -> Result<usize> {
        frame_count(NATIVE_SAMPLE_RATE, self.duration_seconds)
    }
}

/// `floor(sample_rate * seconds)`, rejecting negative or non-finite durations
pub fn frame_count(sample_rate: u32, seconds: f64) -> Result<usize> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(Ym2151Error::invalid(format!(
            "duration must be a non-negative number of seconds, got {seconds}"
        )));
    }
    let frames = (sample_rate as f64 * seconds).floor();
    if frames > usize::MAX as f64 / 2.0 {
        return Err(Ym2151Error::invalid(format!("duration {seconds}s is too long")));
    }
    Ok(frames as usize)
}

/// Interleaved 16-bit stereo samples, one left/right pair per frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcmBuffer {
    samples: Vec<i16>,
}

impl PcmBuffer {
    /// Wrap already interleaved samples
    pub fn from_interleaved(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// Number of stereo frames
    pub fn frame_count(&self) -> usize {
        self.samples.len() / OUTPUT_CHANNELS as usize
    }

    /// Interleaved samples (L, R, L, R, ...)
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Take ownership of the interleaved samples
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    /// Left/right pair of frame `index`
    pub fn frame(&self, index: usize) -> Option<[i16; 2]> {
        let base = index.checked_mul(2)?;
        Some([*self.samples.get(base)?, *self.samples.get(base + 1)?])
    }

    /// Whether no frames were rendered
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Frame loop with optional progress reporting and cancellation
///
/// Progress is reported as a percentage at every 10% boundary and once more
/// with 100 on completion. It is purely observational.
///
/// # Example
///
/// ```no_run
/// # fn demo<B: ym2151::OpmBackend>(chip: &mut ym2151::OpmChip<B>) -> ym2151::Result<()> {
/// use ym2151::Renderer;
///
/// let pcm = Renderer::new()
///     .on_progress(|percent| println!("Progress: {percent}%"))
///     .render(chip, 3.0)?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Renderer<'a> {
    progress: Option<Box<dyn FnMut(u32) + 'a>>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Renderer<'a> {
    /// Renderer without progress or cancellation
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `callback` with the completed percentage at each 10% boundary
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(u32) + 'a,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Stop with [`Ym2151Error::Cancelled`] once `flag` is set
    ///
    /// Checked before every frame. A run that completes is unaffected.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Render `seconds` of audio at the native rate
    pub fn render<B, D>(&mut self, chip: &mut OpmChip<B, D>, seconds: f64) -> Result<PcmBuffer>
    where
        B: OpmBackend,
        D: SettleDelay,
    {
        let frames = frame_count(NATIVE_SAMPLE_RATE, seconds)?;
        self.render_frames(chip, frames)
    }

    /// Render exactly `frames` stereo frames
    pub fn render_frames<B, D>(
        &mut self,
        chip: &mut OpmChip<B, D>,
        frames: usize,
    ) -> Result<PcmBuffer>
    where
        B: OpmBackend,
        D: SettleDelay,
    {
        if !chip.is_initialized() {
            return Err(Ym2151Error::Uninitialized);
        }

        let len = frames.checked_mul(OUTPUT_CHANNELS as usize).ok_or_else(|| {
            Ym2151Error::Allocation(format!("{frames} frames overflow the buffer size"))
        })?;
        let mut samples: Vec<i16> = Vec::new();
        samples.try_reserve_exact(len).map_err(|e| {
            Ym2151Error::Allocation(format!("sample buffer for {frames} frames: {e}"))
        })?;

        info!(frames, rate = NATIVE_SAMPLE_RATE, "rendering");
        let mut next_decile = 0;

        for index in 0..frames {
            if let Some(flag) = self.cancel {
                if flag.load(Ordering::Relaxed) {
                    debug!(index, "render cancelled");
                    return Err(Ym2151Error::Cancelled {
                        frames_rendered: index,
                    });
                }
            }
            if let Some(report) = self.progress.as_mut() {
                while next_decile < 10 && index >= frames * next_decile as usize / 10 {
                    report(next_decile * 10);
                    next_decile += 1;
                }
            }

            let [left, right] = chip.clock()?.halved();
            samples.push(left);
            samples.push(right);
        }

        if let Some(report) = self.progress.as_mut() {
            report(100);
        }
        Ok(PcmBuffer { samples })
    }
}

/// Render `seconds` of audio from a configured chip
pub fn render<B, D>(chip: &mut OpmChip<B, D>, seconds: f64) -> Result<PcmBuffer>
where
    B: OpmBackend,
    D: SettleDelay,
{
    Renderer::new().render(chip, seconds)
}

/// Render exactly `frames` stereo frames from a configured chip
pub fn render_frames<B, D>(chip: &mut OpmChip<B, D>, frames: usize) -> Result<PcmBuffer>
where
    B: OpmBackend,
    D: SettleDelay,
{
    Renderer::new().render_frames(chip, frames)
}
