//! Oriole Core - Event-Driven Audio Output
//!
//! Platform-neutral core of an output driver that bridges a pull-based
//! sample source to a shared hardware playback buffer:
//! - Apartment worker: one thread owns device setup and all control calls
//! - Render loop: a second thread waits for buffer room and fills exactly
//!   the free part of the hardware buffer
//! - Suspend/resume serialized against buffer fills through one mutex
//! - Asynchronous render failures surfaced through a write-once error cell
//!
//! Platform backends implement [`Backend`] and [`Endpoint`]; see the
//! `oriole_platform` crate for WASAPI.

mod apartment;
mod config;
mod driver;
mod error;
mod error_cell;
mod format;
pub mod render;
mod scratch;
mod traits;

#[cfg(test)]
mod testing;

pub use apartment::ApartmentWorker;
pub use config::{DriverConfig, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
pub use driver::{OutputDriver, APARTMENT_THREAD_NAME, RENDER_THREAD_NAME};
pub use error::{DriverError, DriverResult};
pub use error_cell::ErrorCell;
pub use format::{
    channel_mask, StreamFormat, EXTENSIBLE_EXTRA_BYTES, SPEAKER_FRONT_CENTER, SPEAKER_FRONT_LEFT,
    SPEAKER_FRONT_RIGHT, WAVE_FORMAT_EXTENSIBLE,
};
pub use scratch::ScratchBuffer;
pub use traits::{Backend, Endpoint, OutputStream, SampleSource, Silence};
