//! Output Stream Configuration

use serde::{Deserialize, Serialize};

use crate::error::{DriverError, DriverResult};

/// Lowest sample rate accepted before asking the hardware
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Highest sample rate accepted before asking the hardware
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Output stream configuration
///
/// The audio subsystem still has the final word: a configuration that passes
/// `validate()` can be refused during format negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Sample rate in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
        }
    }
}

impl DriverConfig {
    /// Create a configuration for the given rate and channel count
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> DriverResult<Self> {
        serde_json::from_str(json).map_err(|e| DriverError::InvalidConfiguration(e.to_string()))
    }

    /// Calculate bytes per frame (f32 samples * channels)
    pub fn bytes_per_frame(&self) -> usize {
        4 * self.channels as usize
    }

    /// Duration of `frames` frames in milliseconds
    pub fn latency_ms(&self, frames: u32) -> f32 {
        (frames as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Validate configuration
    ///
    /// Runs before any thread is spawned or any hardware call is made.
    pub fn validate(&self) -> DriverResult<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(DriverError::InvalidSampleRate(self.sample_rate));
        }
        if !matches!(self.channels, 1 | 2) {
            return Err(DriverError::UnsupportedChannelCount(self.channels));
        }
        Ok(())
    }
}
