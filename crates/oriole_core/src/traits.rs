//! Driver Seam Traits
//!
//! Defines the interface a platform backend must provide and the interface
//! the driver exposes to callers.

use std::sync::Arc;

use crate::error::{DriverError, DriverResult};
use crate::format::StreamFormat;

/// Pull-based source of interleaved f32 samples (the mixing engine)
///
/// `fill` must always populate the whole buffer synchronously, substituting
/// silence when there is nothing to play. The hardware commit step has no
/// notion of a partial block.
pub trait SampleSource: Send + 'static {
    fn fill(&mut self, samples: &mut [f32]);
}

impl<F> SampleSource for F
where
    F: FnMut(&mut [f32]) + Send + 'static,
{
    fn fill(&mut self, samples: &mut [f32]) {
        self(samples)
    }
}

/// Source that only ever produces silence
#[derive(Debug, Default, Clone, Copy)]
pub struct Silence;

impl SampleSource for Silence {
    fn fill(&mut self, samples: &mut [f32]) {
        samples.fill(0.0);
    }
}

/// An initialized, started hardware render stream
///
/// Split by thread affinity: `start`/`stop` are issued from the apartment
/// thread, everything else from the render thread. Implementations are
/// shared between both threads behind an `Arc`.
pub trait Endpoint: Send + Sync + 'static {
    /// Hardware buffer capacity in frames, fixed after initialization
    fn buffer_frames(&self) -> u32;

    /// Block until the hardware signals buffer room (or `wake` is called)
    fn wait_ready(&self) -> DriverResult<()>;

    /// Frames queued in the hardware buffer but not yet played
    fn current_padding(&self) -> DriverResult<u32>;

    /// Acquire `frames` frames of the hardware buffer, let `write` fill the
    /// interleaved samples, then commit exactly `frames` frames
    fn write_frames(&self, frames: u32, write: &mut dyn FnMut(&mut [f32])) -> DriverResult<()>;

    /// Start (or restart) playback
    fn start(&self) -> DriverResult<()>;

    /// Stop playback; queued frames are kept
    fn stop(&self) -> DriverResult<()>;

    /// Release a render thread blocked in `wait_ready`
    fn wake(&self) -> DriverResult<()>;
}

impl<E> Endpoint for Arc<E>
where
    E: Endpoint + ?Sized,
{
    fn buffer_frames(&self) -> u32 {
        (**self).buffer_frames()
    }

    fn wait_ready(&self) -> DriverResult<()> {
        (**self).wait_ready()
    }

    fn current_padding(&self) -> DriverResult<u32> {
        (**self).current_padding()
    }

    fn write_frames(&self, frames: u32, write: &mut dyn FnMut(&mut [f32])) -> DriverResult<()> {
        (**self).write_frames(frames, write)
    }

    fn start(&self) -> DriverResult<()> {
        (**self).start()
    }

    fn stop(&self) -> DriverResult<()> {
        (**self).stop()
    }

    fn wake(&self) -> DriverResult<()> {
        (**self).wake()
    }
}

/// Platform audio backend
///
/// Both methods are called on threads the driver owns: `enter_thread` once
/// at the start of the apartment and render threads, `open_default` inside a
/// job on the apartment thread.
pub trait Backend: Send + Sync + 'static {
    type Endpoint: Endpoint;

    /// Per-thread platform context, held until the thread exits
    type ThreadGuard: 'static;

    /// Backend name (e.g., "WASAPI")
    fn name(&self) -> &'static str;

    /// Enter the platform's threading context on the current thread
    fn enter_thread(&self) -> DriverResult<Self::ThreadGuard>;

    /// Open the default render endpoint with exactly `format`
    ///
    /// The returned endpoint is initialized but not yet started.
    fn open_default(&self, format: &StreamFormat) -> DriverResult<Self::Endpoint>;
}

/// A running output stream, as seen by the code that owns it
pub trait OutputStream: Send {
    /// Stop playback, waiting for any in-flight buffer fill
    fn suspend(&self) -> DriverResult<()>;

    /// Restart playback after `suspend`
    fn resume(&self) -> DriverResult<()>;

    /// First fatal error raised by the render thread, if any
    ///
    /// Poll this periodically; once it returns `Some`, the stream is dead.
    fn current_error(&self) -> Option<DriverError>;

    /// Negotiated format
    fn format(&self) -> StreamFormat;
}
