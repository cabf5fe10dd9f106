//! Output Driver
//!
//! Ties the apartment thread, the render thread and the shared driver
//! context together.
//!
//! # Architecture
//!
//! ```text
//! Caller Thread                Apartment Thread              Render Thread
//! ─────────────                ────────────────              ─────────────
//! OutputDriver::new ──run──►   open_default + start
//!   │                                                        wait_ready
//!   │                                                          │
//! suspend/resume ────run──►   lock(fill) + stop/start         lock(fill) + fill_cycle
//!   │                                                          │
//! current_error ◄──────────── ErrorCell ◄───────────────────── terminate
//! ```
//!
//! The fill mutex is the single point of mutual exclusion: fills, stops and
//! starts never interleave.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::apartment::ApartmentWorker;
use crate::config::DriverConfig;
use crate::error::{DriverError, DriverResult};
use crate::error_cell::ErrorCell;
use crate::format::StreamFormat;
use crate::render::{self, FillState};
use crate::traits::{Backend, Endpoint, OutputStream, SampleSource};

/// Name of the thread that owns device/client setup and control calls
pub const APARTMENT_THREAD_NAME: &str = "oriole-apartment";

/// Name of the thread that waits on the readiness signal and fills buffers
pub const RENDER_THREAD_NAME: &str = "oriole-render";

/// State shared by the caller, apartment and render threads
pub(crate) struct DriverContext<E: Endpoint> {
    pub(crate) endpoint: E,
    format: StreamFormat,
    /// Read once after initialization
    buffer_frames: u32,
    fill: Mutex<FillState>,
    error: ErrorCell,
    closing: AtomicBool,
    suspended: AtomicBool,
}

impl<E: Endpoint> DriverContext<E> {
    fn new(endpoint: E, format: StreamFormat, source: Box<dyn SampleSource>) -> Self {
        let buffer_frames = endpoint.buffer_frames();

        Self {
            endpoint,
            format,
            buffer_frames,
            fill: Mutex::new(FillState::new(source)),
            error: ErrorCell::new(),
            closing: AtomicBool::new(false),
            suspended: AtomicBool::new(false),
        }
    }

    /// Run one fill cycle under the fill mutex
    pub(crate) fn fill_once(&self) -> DriverResult<u32> {
        let mut state = self.fill.lock();
        render::fill_cycle(
            &self.endpoint,
            self.buffer_frames,
            self.format.channels,
            &mut state,
        )
    }

    /// Stop or start the client; never overlaps a fill cycle
    fn set_playing(&self, playing: bool) -> DriverResult<()> {
        let _fill = self.fill.lock();

        if playing {
            self.endpoint.start()?;
        } else {
            self.endpoint.stop()?;
        }

        self.suspended.store(!playing, Ordering::SeqCst);
        Ok(())
    }

    /// Render-loop failure: stop the client and record the first error
    pub(crate) fn terminate(&self, err: DriverError) {
        if let Err(stop_err) = self.endpoint.stop() {
            debug!("Stop after render failure also failed: {}", stop_err);
        }

        if self.error.try_store(err.clone()) {
            error!("Render loop terminated: {}", err);
        } else {
            debug!("Discarding later render failure: {}", err);
        }
    }

    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }
}

/// Event-driven output stream over a platform backend
///
/// Construction blocks until the device is opened and playing. Dropping the
/// driver closes the stream.
pub struct OutputDriver<B: Backend> {
    /// `None` once closed
    context: Option<Arc<DriverContext<B::Endpoint>>>,
    /// Apartment thread (device/client control)
    worker: ApartmentWorker,
    /// Render thread handle
    render_thread: Option<JoinHandle<()>>,
    /// Negotiated format, kept outside the context for cheap access
    format: StreamFormat,
    buffer_frames: u32,
    backend_name: &'static str,
}

impl<B: Backend> OutputDriver<B> {
    /// Open the default render endpoint and start playback
    ///
    /// Rejects unsupported configurations before touching hardware. Any
    /// setup failure is returned here with no threads left running.
    pub fn new<S: SampleSource>(backend: B, config: DriverConfig, source: S) -> DriverResult<Self> {
        let format = StreamFormat::from_config(&config)?;
        let backend = Arc::new(backend);
        let backend_name = backend.name();

        info!(
            "Opening {} output: {} Hz, {} channel(s), {} bytes/frame",
            backend_name,
            format.sample_rate,
            format.channels,
            config.bytes_per_frame()
        );

        let worker = {
            let backend = Arc::clone(&backend);
            ApartmentWorker::spawn(APARTMENT_THREAD_NAME, move || backend.enter_thread())?
        };

        let endpoint = {
            let backend = Arc::clone(&backend);
            worker.run(move || open_and_start(&*backend, &format))??
        };

        let context = Arc::new(DriverContext::new(endpoint, format, Box::new(source)));
        let buffer_frames = context.buffer_frames;

        info!(
            "{} output started: {} frames buffer ({:.1} ms)",
            backend_name,
            buffer_frames,
            config.latency_ms(buffer_frames)
        );

        let spawned = {
            let backend = Arc::clone(&backend);
            let context = Arc::clone(&context);
            thread::Builder::new()
                .name(RENDER_THREAD_NAME.into())
                .spawn(move || render::render_thread_main(backend, context))
        };

        let render_thread = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                release_after_failed_setup(&worker, context);
                return Err(DriverError::ThreadSpawn {
                    name: RENDER_THREAD_NAME.into(),
                    reason: e.to_string(),
                });
            }
        };

        Ok(Self {
            context: Some(context),
            worker,
            render_thread: Some(render_thread),
            format,
            buffer_frames,
            backend_name,
        })
    }

    fn context(&self) -> DriverResult<&Arc<DriverContext<B::Endpoint>>> {
        self.context.as_ref().ok_or(DriverError::Closed)
    }

    /// Stop playback
    ///
    /// Runs on the apartment thread and waits for any in-flight fill cycle.
    /// Failures are returned here and never recorded as render errors.
    pub fn suspend(&self) -> DriverResult<()> {
        let context = Arc::clone(self.context()?);
        self.worker.run(move || context.set_playing(false))??;

        info!("{} output suspended", self.backend_name);
        Ok(())
    }

    /// Restart playback after `suspend`
    pub fn resume(&self) -> DriverResult<()> {
        let context = Arc::clone(self.context()?);
        self.worker.run(move || context.set_playing(true))??;

        info!("{} output resumed", self.backend_name);
        Ok(())
    }

    /// First fatal error raised by the render thread
    pub fn current_error(&self) -> Option<DriverError> {
        match &self.context {
            Some(context) => context.error.load(),
            None => Some(DriverError::Closed),
        }
    }

    /// Whether the last successful control call was `suspend`
    pub fn is_suspended(&self) -> bool {
        self.context
            .as_ref()
            .map_or(true, |c| c.suspended.load(Ordering::SeqCst))
    }

    /// Negotiated format
    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// Hardware buffer capacity in frames
    pub fn buffer_frames(&self) -> u32 {
        self.buffer_frames
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    /// Stop playback and shut both threads down
    pub fn close(mut self) -> DriverResult<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> DriverResult<()> {
        let Some(context) = self.context.take() else {
            return Ok(());
        };

        info!("Closing {} output", self.backend_name);
        context.closing.store(true, Ordering::SeqCst);

        // Client stops before any thread goes away
        let stopped = {
            let context = Arc::clone(&context);
            self.worker.run(move || context.set_playing(false)).and_then(|r| r)
        };

        if let Some(handle) = self.render_thread.take() {
            match context.endpoint.wake() {
                Ok(()) => {
                    if handle.join().is_err() {
                        warn!("Render thread panicked during close");
                    }
                }
                // Joining would block forever on the readiness wait
                Err(e) => warn!("Failed to wake render thread, detaching it: {}", e),
            }
        }

        // Client objects are released where they were created
        let _ = self.worker.run(move || drop(context));
        self.worker.shutdown()?;

        debug!("{} output closed", self.backend_name);

        stopped
    }
}

/// Stop a started endpoint and release it on the apartment thread
///
/// Used when setup fails after the client started; nothing may be left
/// playing. Failures here are logged, the setup error is what gets returned.
fn release_after_failed_setup<E: Endpoint>(worker: &ApartmentWorker, context: Arc<DriverContext<E>>) {
    let released = worker.run(move || {
        if let Err(e) = context.endpoint.stop() {
            warn!("Stop during setup rollback failed: {}", e);
        }
        drop(context);
    });

    if let Err(e) = released {
        warn!("Setup rollback could not reach the apartment thread: {}", e);
    }
}

fn open_and_start<B: Backend>(backend: &B, format: &StreamFormat) -> DriverResult<B::Endpoint> {
    let endpoint = backend.open_default(format)?;
    endpoint.start()?;
    Ok(endpoint)
}

impl<B: Backend> Drop for OutputDriver<B> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Error closing {} output: {}", self.backend_name, e);
        }
    }
}

impl<B: Backend> OutputStream for OutputDriver<B> {
    fn suspend(&self) -> DriverResult<()> {
        OutputDriver::suspend(self)
    }

    fn resume(&self) -> DriverResult<()> {
        OutputDriver::resume(self)
    }

    fn current_error(&self) -> Option<DriverError> {
        OutputDriver::current_error(self)
    }

    fn format(&self) -> StreamFormat {
        OutputDriver::format(self)
    }
}
