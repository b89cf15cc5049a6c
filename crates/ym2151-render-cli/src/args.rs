//! Command-line arguments for the test tone renderer.

use std::path::PathBuf;

use clap::Parser;

/// Parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "opm-render", version)]
#[command(about = "Render a 3 second 440 Hz YM2151 test tone to a 16-bit stereo WAV file")]
pub struct Args {
    /// WAV file to write
    #[arg(default_value = "output.wav")]
    pub output: PathBuf,
}
