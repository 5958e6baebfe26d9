//! Decoded audio clips

use std::fmt;
use std::sync::Arc;

/// Shared handle to a decoded clip.
///
/// This is what the override registry stores and what lookups hand back;
/// cloning it never copies sample data.
pub type ClipHandle = Arc<AudioClip>;

/// Audio container formats a decoder can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AudioFormat {
    /// Uncompressed RIFF/WAVE
    #[default]
    Wav,
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wav => write!(f, "wav"),
        }
    }
}

/// A decoded, playable audio asset
#[derive(Clone, PartialEq)]
pub struct AudioClip {
    name: String,
    channels: u16,
    sample_rate: u32,
    /// Interleaved samples in [-1.0, 1.0]
    samples: Vec<f32>,
}

impl AudioClip {
    /// Create a clip from interleaved samples
    pub fn new(name: impl Into<String>, channels: u16, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            channels,
            sample_rate,
            samples,
        }
    }

    /// Wrap into a shared handle
    pub fn into_handle(self) -> ClipHandle {
        Arc::new(self)
    }

    /// The clip's own identifier
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of interleaved channels
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of sample frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Duration in seconds
    pub fn length(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f32 / self.sample_rate as f32
        }
    }
}

impl fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioClip")
            .field("name", &self.name)
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames())
            .finish()
    }
}
