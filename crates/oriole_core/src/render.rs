//! Render Loop
//!
//! The render thread alternates between two states:
//!
//! ```text
//!            readiness signal
//!   Waiting ──────────────────► Filling (fill mutex held)
//!      ▲                           │
//!      └───────── cycle done ──────┘
//!
//!   any wait/fill failure ──► Terminated (client stopped, error recorded)
//! ```
//!
//! There is no restart: once terminated, the stream stays dead until the
//! driver is rebuilt.
//!
//! # Real-Time Safety
//!
//! The fill cycle is the hot path:
//! - NO allocations once the scratch buffer has reached its peak size
//! - NO logging
//! - NO blocking other than the fill mutex, which suspend/resume hold only
//!   for the duration of a stop/start call

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::driver::DriverContext;
use crate::error::{DriverError, DriverResult};
use crate::scratch::ScratchBuffer;
use crate::traits::{Backend, Endpoint, SampleSource};

/// State touched by a fill cycle; lives behind the context's fill mutex
pub struct FillState {
    scratch: ScratchBuffer,
    source: Box<dyn SampleSource>,
}

impl FillState {
    pub fn new(source: Box<dyn SampleSource>) -> Self {
        Self {
            scratch: ScratchBuffer::new(),
            source,
        }
    }

    pub fn scratch(&self) -> &ScratchBuffer {
        &self.scratch
    }
}

/// One buffer-fill cycle
///
/// Fills exactly the free part of the hardware buffer (`capacity - padding`
/// frames) and returns the number of frames committed. A full buffer is a
/// no-op: the hardware woke us slightly early.
pub fn fill_cycle<E>(
    endpoint: &E,
    capacity: u32,
    channels: u16,
    state: &mut FillState,
) -> DriverResult<u32>
where
    E: Endpoint + ?Sized,
{
    let padding = endpoint.current_padding()?;

    let available = capacity.saturating_sub(padding);
    if available == 0 {
        return Ok(0);
    }

    let len = available as usize * channels as usize;
    let FillState { scratch, source } = state;

    endpoint.write_frames(available, &mut |hardware: &mut [f32]| {
        let samples = scratch.prepare(len);
        source.fill(samples);
        hardware.copy_from_slice(samples);
    })?;

    scratch.clear();

    Ok(available)
}

/// Wait/fill until a failure or until the context starts closing
pub(crate) fn render_loop<E: Endpoint>(ctx: &DriverContext<E>) -> DriverResult<()> {
    loop {
        ctx.endpoint.wait_ready()?;

        if ctx.is_closing() {
            return Ok(());
        }

        ctx.fill_once()?;
    }
}

/// Entry point for the render thread
///
/// Enters the platform threading context (the render thread touches the
/// same client objects as the apartment thread), runs the loop and turns
/// any way out of it other than a requested close into a terminal error.
pub(crate) fn render_thread_main<B: Backend>(backend: Arc<B>, ctx: Arc<DriverContext<B::Endpoint>>) {
    tracing::debug!("Render thread starting");

    let _guard = match backend.enter_thread() {
        Ok(guard) => guard,
        Err(e) => {
            ctx.terminate(e);
            return;
        }
    };

    match panic::catch_unwind(AssertUnwindSafe(|| render_loop(&ctx))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) if ctx.is_closing() => {
            tracing::debug!("Render loop ended during close: {}", e);
        }
        Ok(Err(e)) => ctx.terminate(e),
        Err(_) => ctx.terminate(DriverError::RenderThreadPanicked),
    }

    tracing::debug!("Render thread exiting");
}
