//! Standalone YM2151 test tone renderer.
//!
//! Programs channel 0 of the reference engine with the default voice at
//! 440 Hz, renders 3 seconds at the native 55,930 Hz rate and stores the result
//! as 16-bit stereo PCM WAV.
//!
//! ```text
//! opm-render [OUTPUT]      # OUTPUT defaults to output.wav
//! ```
//!
//! Progress goes to stdout, diagnostics (`RUST_LOG`) to stderr. Exit code is
//! 0 on success and 1 on any failure.

mod args;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use ym2151::{configure_voice, OpmChip, RenderConfig, Renderer, VoicePatch, WavFile};
use ym2151_softsynth::SoftOpm;

use crate::args::Args;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = RenderConfig::reference();
    println!(
        "Generating {}Hz tone for {} seconds...",
        config.frequency_hz, config.duration_seconds
    );

    // Fail on an unusable path before spending time on the chip
    let file = WavFile::create(&args.output)?;

    let mut chip: OpmChip<SoftOpm> = OpmChip::new();
    chip.create().context("Could not create YM2151 engine")?;
    chip.reset()?;
    let pitch = configure_voice(
        &mut chip,
        config.channel,
        config.frequency_hz,
        &VoicePatch::default(),
    )
    .context("Could not program the test voice")?;
    info!(block = pitch.block, fnum = pitch.fnum, "voice ready");

    let frames = config.frame_count()?;
    println!("Generating {frames} samples at {} Hz...", config.sample_rate());

    let pcm = Renderer::new()
        .on_progress(|percent| {
            if percent < 100 {
                println!("Progress: {percent}%");
            }
        })
        .render_frames(&mut chip, frames)
        .context("Could not render samples")?;
    chip.destroy();

    file.write(
        config.sample_rate(),
        config.channels(),
        config.bits_per_sample(),
        pcm.samples(),
    )
    .with_context(|| format!("Could not write {}", args.output.display()))?;

    println!("Done! WAV file saved to {}", args.output.display());
    Ok(())
}
