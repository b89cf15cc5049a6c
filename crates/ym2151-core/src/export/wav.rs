//! WAV file export functionality

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::constants::WAV_HEADER_LEN;
use crate::{Result, Ym2151Error};

/// Samples encoded per write call
const CHUNK_SAMPLES: usize = 4096;

/// Header of a canonical PCM WAV file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
    /// Payload length in bytes
    pub data_len: u32,
}

impl WavHeader {
    /// Header for `sample_count` interleaved samples
    ///
    /// Fails when the format is degenerate or the payload does not fit the
    /// container's 32-bit size fields.
    pub fn for_samples(
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
        sample_count: usize,
    ) -> Result<Self> {
        if channels == 0 {
            return Err(Ym2151Error::invalid("channel count must be at least 1"));
        }
        if bits_per_sample == 0 || bits_per_sample % 8 != 0 {
            return Err(Ym2151Error::invalid(format!(
                "bits per sample must be a positive multiple of 8, got {bits_per_sample}"
            )));
        }
        let too_large =
            || Ym2151Error::invalid(format!("{sample_count} samples exceed the WAV size limit"));
        let data_len = sample_count
            .checked_mul(bits_per_sample as usize / 8)
            .and_then(|len| u32::try_from(len).ok())
            .filter(|len| len.checked_add(36).is_some())
            .ok_or_else(too_large)?;
        let header = Self {
            sample_rate,
            channels,
            bits_per_sample,
            data_len,
        };
        header
            .block_align()
            .checked_mul(sample_rate)
            .ok_or_else(|| {
                Ym2151Error::invalid(format!("byte rate overflows at {sample_rate} Hz"))
            })?;
        Ok(header)
    }

    /// Bytes per interleaved frame
    pub fn block_align(&self) -> u32 {
        self.channels as u32 * (self.bits_per_sample as u32 / 8)
    }

    /// Bytes per second
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.wrapping_mul(self.block_align())
    }

    /// RIFF chunk size: everything after the first 8 bytes
    pub fn riff_len(&self) -> u32 {
        36 + self.data_len
    }

    /// Serialized little-endian header
    pub fn to_bytes(&self) -> [u8; WAV_HEADER_LEN] {
        let mut out = [0u8; WAV_HEADER_LEN];
        let fields: [&[u8]; 13] = [
            b"RIFF",
            &self.riff_len().to_le_bytes(),
            b"WAVE",
            b"fmt ",
            &16u32.to_le_bytes(), // fmt chunk size
            &1u16.to_le_bytes(),  // PCM
            &self.channels.to_le_bytes(),
            &self.sample_rate.to_le_bytes(),
            &self.byte_rate().to_le_bytes(),
            &(self.block_align() as u16).to_le_bytes(),
            &self.bits_per_sample.to_le_bytes(),
            b"data",
            &self.data_len.to_le_bytes(),
        ];
        let mut pos = 0;
        for field in fields {
            out[pos..pos + field.len()].copy_from_slice(field);
            pos += field.len();
        }
        out
    }
}

/// Write header and samples to any byte sink
///
/// Only 16-bit samples are stored, so `bits_per_sample` must be 16.
pub fn write_wav_to<W: Write>(
    writer: &mut W,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    samples: &[i16],
) -> Result<()> {
    if bits_per_sample != 16 {
        return Err(Ym2151Error::invalid(format!(
            "only 16-bit PCM can be written, got {bits_per_sample} bits"
        )));
    }
    let header = WavHeader::for_samples(sample_rate, channels, bits_per_sample, samples.len())?;
    writer.write_all(&header.to_bytes())?;

    let mut bytes = Vec::with_capacity(CHUNK_SAMPLES.min(samples.len()) * 2);
    for chunk in samples.chunks(CHUNK_SAMPLES) {
        bytes.clear();
        for sample in chunk {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        writer.write_all(&bytes)?;
    }
    debug!(bytes = header.data_len, "wrote WAV payload");
    Ok(())
}

/// Output file opened ahead of rendering
pub struct WavFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl WavFile {
    /// Create (or truncate) `path` for writing
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| Ym2151Error::FileOpen {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Path the file was opened at
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the complete container and close the file
    pub fn write(
        mut self,
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
        samples: &[i16],
    ) -> Result<()> {
        write_wav_to(&mut self.writer, sample_rate, channels, bits_per_sample, samples)?;
        self.writer.flush()?;
        info!(path = %self.path.display(), samples = samples.len(), "WAV file written");
        Ok(())
    }
}

/// Create `path` and write a complete WAV file to it
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    samples: &[i16],
) -> Result<()> {
    WavFile::create(path)?.write(sample_rate, channels, bits_per_sample, samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NATIVE_SAMPLE_RATE;

    #[test]
    fn test_reference_header_fields() {
        let header = WavHeader::for_samples(NATIVE_SAMPLE_RATE, 2, 16, 167_790 * 2).unwrap();
        assert_eq!(header.data_len, 671_160);
        assert_eq!(header.riff_len(), 671_196);
        assert_eq!(header.byte_rate(), 223_720);
        assert_eq!(header.block_align(), 4);

        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[4..8], &671_196u32.to_le_bytes());
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(&bytes[16..20], &16u32.to_le_bytes());
        assert_eq!(&bytes[20..22], &1u16.to_le_bytes());
        assert_eq!(&bytes[22..24], &2u16.to_le_bytes());
        assert_eq!(&bytes[24..28], &55_930u32.to_le_bytes());
        assert_eq!(&bytes[28..32], &223_720u32.to_le_bytes());
        assert_eq!(&bytes[32..34], &4u16.to_le_bytes());
        assert_eq!(&bytes[34..36], &16u16.to_le_bytes());
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(&bytes[40..44], &671_160u32.to_le_bytes());
    }

    #[test]
    fn test_empty_payload() {
        let mut out = Vec::new();
        write_wav_to(&mut out, NATIVE_SAMPLE_RATE, 2, 16, &[]).unwrap();
        assert_eq!(out.len(), 44);
        assert_eq!(&out[4..8], &36u32.to_le_bytes());
        assert_eq!(&out[40..44], &0u32.to_le_bytes());
    }

    #[test]
    fn test_samples_are_little_endian() {
        let mut out = Vec::new();
        write_wav_to(&mut out, 8000, 2, 16, &[0x1234, -2]).unwrap();
        assert_eq!(&out[44..], &[0x34, 0x12, 0xFE, 0xFF]);
    }

    #[test]
    fn test_payload_larger_than_one_chunk() {
        let samples: Vec<i16> = (0..(CHUNK_SAMPLES as i16 + 7)).collect();
        let mut out = Vec::new();
        write_wav_to(&mut out, 8000, 1, 16, &samples).unwrap();
        assert_eq!(out.len(), 44 + samples.len() * 2);
        let last = &out[out.len() - 2..];
        assert_eq!(i16::from_le_bytes([last[0], last[1]]), *samples.last().unwrap());
    }

    #[test]
    fn test_rejects_bad_formats() {
        let mut out = Vec::new();
        assert!(write_wav_to(&mut out, 8000, 2, 24, &[]).is_err());
        assert!(write_wav_to(&mut out, 8000, 0, 16, &[]).is_err());
        assert!(out.is_empty());
        assert!(WavHeader::for_samples(8000, 2, 16, usize::MAX / 2).is_err());
        assert!(WavHeader::for_samples(u32::MAX, 2, 16, 0).is_err());
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.wav");
        match WavFile::create(&path) {
            Err(Ym2151Error::FileOpen { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected FileOpen, got {:?}", other.map(|f| f.path().to_path_buf())),
        }
    }

    #[test]
    fn test_file_readable_by_hound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<i16> = (0..200).map(|i| (i * 150 - 15_000) as i16).collect();
        write_wav(&path, NATIVE_SAMPLE_RATE, 2, 16, &samples).unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 44 + 400);
        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, NATIVE_SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);
    }
}
