//! Audio container output
//!
//! Rendered PCM is stored in a canonical 44-byte-header RIFF/WAVE container
//! (uncompressed PCM, no extra chunks).
//!
//! # Examples
//!
//! ```no_run
//! use ym2151::export::WavFile;
//!
//! # fn main() -> ym2151::Result<()> {
//! // Open first so an unwritable path fails before any rendering work
//! let file = WavFile::create("output.wav")?;
//! let samples: Vec<i16> = vec![0; 2 * 55_930];
//! file.write(55_930, 2, 16, &samples)?;
//! # Ok(())
//! # }
//! ```

pub mod wav;

pub use wav::{write_wav, write_wav_to, WavFile, WavHeader};
