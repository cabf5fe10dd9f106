//! Stream Format Negotiation Math
//!
//! The driver only ever asks for one shape of format: interleaved 32-bit
//! float samples in an extensible descriptor. Everything that can be derived
//! without touching hardware lives here so it can be checked on any platform.

use crate::config::{DriverConfig, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
use crate::error::{DriverError, DriverResult};

/// Speaker position bits (ksmedia.h)
pub const SPEAKER_FRONT_LEFT: u32 = 0x1;
pub const SPEAKER_FRONT_RIGHT: u32 = 0x2;
pub const SPEAKER_FRONT_CENTER: u32 = 0x4;

/// Format tag for an extensible descriptor
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Size of the extension that follows the base descriptor, in bytes
pub const EXTENSIBLE_EXTRA_BYTES: u16 = 22;

/// Map a channel count to its speaker mask
///
/// Mono plays from the front center, stereo from front left/right.
pub fn channel_mask(channels: u16) -> DriverResult<u32> {
    match channels {
        1 => Ok(SPEAKER_FRONT_CENTER),
        2 => Ok(SPEAKER_FRONT_LEFT | SPEAKER_FRONT_RIGHT),
        other => Err(DriverError::UnsupportedChannelCount(other)),
    }
}

/// Negotiated output format
///
/// Fixed once accepted during setup; never renegotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub channel_mask: u32,
    pub block_align: u16,
    pub avg_bytes_per_sec: u32,
}

impl StreamFormat {
    /// Float samples are always 32 bits wide
    pub const BITS_PER_SAMPLE: u16 = 32;

    /// Build the candidate format for a rate and channel count
    ///
    /// Rejects unsupported channel counts and sample rates outside
    /// `MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE` before any hardware call, the
    /// same rules `DriverConfig::validate` applies.
    pub fn new(sample_rate: u32, channels: u16) -> DriverResult<Self> {
        let channel_mask = channel_mask(channels)?;
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(DriverError::InvalidSampleRate(sample_rate));
        }

        let block_align = channels * Self::BITS_PER_SAMPLE / 8;

        Ok(Self {
            sample_rate,
            channels,
            channel_mask,
            block_align,
            avg_bytes_per_sec: sample_rate * block_align as u32,
        })
    }

    /// Build the candidate format for a validated configuration
    pub fn from_config(config: &DriverConfig) -> DriverResult<Self> {
        config.validate()?;
        Self::new(config.sample_rate, config.channels)
    }
}
