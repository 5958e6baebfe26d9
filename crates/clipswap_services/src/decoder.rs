//! Audio decoding capability
//!
//! The loader hands raw container bytes to an [`AudioDecoder`] and gets a
//! clip back. A host with its own decoder plugs it in here; [`WavDecoder`]
//! covers uncompressed WAV without a host.

use std::io::Cursor;
use thiserror::Error;

use clipswap_core::{AudioClip, AudioFormat};

/// Decoder failures
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(AudioFormat),

    #[error("Invalid {format} data: {reason}")]
    InvalidData { format: AudioFormat, reason: String },
}

/// Turns container bytes into a playable clip
pub trait AudioDecoder: Send + Sync {
    /// Decode `bytes` in `format`, naming the clip `name`
    fn decode(&self, name: &str, bytes: &[u8], format: AudioFormat) -> Result<AudioClip, DecodeError>;
}

/// Decoder for uncompressed PCM and float WAV files
#[derive(Debug, Default, Clone, Copy)]
pub struct WavDecoder;

impl WavDecoder {
    /// Create a new WAV decoder
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for WavDecoder {
    fn decode(&self, name: &str, bytes: &[u8], format: AudioFormat) -> Result<AudioClip, DecodeError> {
        if format != AudioFormat::Wav {
            return Err(DecodeError::UnsupportedFormat(format));
        }

        let invalid = |e: hound::Error| DecodeError::InvalidData {
            format,
            reason: e.to_string(),
        };

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(invalid)?;
        let spec = reader.spec();

        let samples: Result<Vec<f32>, _> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect(),
            hound::SampleFormat::Int => {
                let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|s| s as f32 / max_value))
                    .collect()
            }
        };

        Ok(AudioClip::new(name, spec.channels, spec.sample_rate, samples.map_err(invalid)?))
    }
}
