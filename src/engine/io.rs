//! WAV file I/O for voxfx
//!
//! Decoding of compressed formats belongs to an external collaborator; this
//! module only reads and writes WAV. Imported audio keeps its native sample
//! rate and is downmixed to mono by averaging channels.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::engine::buffer::AudioBuffer;
use crate::error::{Result, VoxError};

/// Export bit depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    /// 16-bit signed integer PCM
    Int16,
    /// 24-bit signed integer PCM
    Int24,
    /// 32-bit IEEE float
    #[default]
    Float32,
}

impl BitDepth {
    /// Parse a bit depth from its bit count (16, 24 or 32)
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            16 => Ok(BitDepth::Int16),
            24 => Ok(BitDepth::Int24),
            32 => Ok(BitDepth::Float32),
            _ => Err(VoxError::UnsupportedFormat {
                format: format!("{}-bit audio (only 16, 24, 32 supported)", bits),
            }),
        }
    }

    fn spec(self, sample_rate: u32) -> WavSpec {
        let (bits_per_sample, sample_format) = match self {
            BitDepth::Int16 => (16, SampleFormat::Int),
            BitDepth::Int24 => (24, SampleFormat::Int),
            BitDepth::Float32 => (32, SampleFormat::Float),
        };
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

/// Import a WAV file as a mono buffer
///
/// # Arguments
/// * `path` - Path to the WAV file to import
///
/// # Errors
/// * `Audio` - If the file cannot be opened or decoded
/// * `UnsupportedFormat` - If the integer bit depth is not 8/16/24/32
/// * `InvalidInput` - If the file holds no samples
pub fn import_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path).map_err(|source| VoxError::Audio {
        path: path.display().to_string(),
        source,
    })?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    debug!(
        "Reading {}: {} Hz, {} channel(s), {}-bit {:?}",
        path.display(),
        spec.sample_rate,
        channels,
        spec.bits_per_sample,
        spec.sample_format
    );

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)
        .map_err(|e| match e {
            VoxError::Audio { source, .. } => VoxError::Audio {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;

    let buffer = AudioBuffer::new(downmix(&interleaved, channels), spec.sample_rate);
    buffer.validate()?;
    Ok(buffer)
}

/// Export a mono buffer to a WAV file
///
/// # Arguments
/// * `buffer` - The audio buffer to export
/// * `path` - Path where the file will be written
/// * `depth` - Sample encoding
pub fn export_wav(buffer: &AudioBuffer, path: &Path, depth: BitDepth) -> Result<()> {
    let wav_err = |source| VoxError::Audio {
        path: path.display().to_string(),
        source,
    };

    let mut writer = WavWriter::create(path, depth.spec(buffer.sample_rate())).map_err(wav_err)?;

    match depth {
        BitDepth::Int16 => {
            for &sample in buffer.samples() {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(wav_err)?;
            }
        }
        BitDepth::Int24 => {
            for &sample in buffer.samples() {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(wav_err)?;
            }
        }
        BitDepth::Float32 => {
            for &sample in buffer.samples() {
                writer.write_sample(sample).map_err(wav_err)?;
            }
        }
    }

    writer.finalize().map_err(wav_err)?;
    debug!("Wrote {} samples to {}", buffer.len(), path.display());
    Ok(())
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let wav_err = |source| VoxError::Audio {
        path: String::new(),
        source,
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(wav_err),
        SampleFormat::Int => {
            let scale = match bits_per_sample {
                8 => 128.0,
                16 => 32768.0,
                24 => 8388608.0,
                32 => 2147483648.0,
                _ => {
                    return Err(VoxError::UnsupportedFormat {
                        format: format!("{}-bit integer audio", bits_per_sample),
                    })
                }
            };
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(wav_err)
        }
    }
}

/// Average interleaved frames down to a single channel
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
