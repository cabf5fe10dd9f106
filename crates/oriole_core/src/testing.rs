//! Test doubles for the platform seam
//!
//! `FakeHardware` stands in for a shared-mode client plus its render buffer
//! service and readiness event; `FakeBackend` opens it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{DriverError, DriverResult};
use crate::format::StreamFormat;
use crate::traits::{Backend, Endpoint, SampleSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HardwareEvent {
    Start,
    Stop,
    Write(u32),
}

pub(crate) struct FakeHardware {
    capacity: u32,
    channels: u16,
    paddings: Mutex<VecDeque<u32>>,
    padding_failure: Mutex<Option<DriverError>>,
    wait_failure: Mutex<Option<DriverError>>,
    start_failure: Mutex<Option<DriverError>>,
    stop_failure: Mutex<Option<DriverError>>,
    free_running: AtomicBool,
    tick_tx: Sender<()>,
    tick_rx: Receiver<()>,
    events: Mutex<Vec<HardwareEvent>>,
    last_written: Mutex<Vec<f32>>,
    playing: AtomicBool,
    copying: AtomicBool,
    violations: AtomicUsize,
    control_threads: Mutex<Vec<ThreadId>>,
    entered: Mutex<Vec<String>>,
    opened_on: Mutex<Option<ThreadId>>,
}

impl FakeHardware {
    pub fn new(capacity: u32, channels: u16) -> Arc<Self> {
        let (tick_tx, tick_rx) = crossbeam_channel::unbounded();
        Arc::new(Self {
            capacity,
            channels,
            paddings: Mutex::new(VecDeque::new()),
            padding_failure: Mutex::new(None),
            wait_failure: Mutex::new(None),
            start_failure: Mutex::new(None),
            stop_failure: Mutex::new(None),
            free_running: AtomicBool::new(false),
            tick_tx,
            tick_rx,
            events: Mutex::new(Vec::new()),
            last_written: Mutex::new(Vec::new()),
            playing: AtomicBool::new(false),
            copying: AtomicBool::new(false),
            violations: AtomicUsize::new(0),
            control_threads: Mutex::new(Vec::new()),
            entered: Mutex::new(Vec::new()),
            opened_on: Mutex::new(None),
        })
    }

    /// Padding values returned by the next queries; 0 once exhausted
    pub fn script_padding(&self, paddings: impl IntoIterator<Item = u32>) {
        self.paddings.lock().extend(paddings);
    }

    pub fn fail_next_padding(&self, err: DriverError) {
        *self.padding_failure.lock() = Some(err);
    }

    pub fn fail_next_wait(&self, err: DriverError) {
        *self.wait_failure.lock() = Some(err);
    }

    pub fn fail_next_start(&self, err: DriverError) {
        *self.start_failure.lock() = Some(err);
    }

    pub fn fail_next_stop(&self, err: DriverError) {
        *self.stop_failure.lock() = Some(err);
    }

    /// Make `wait_ready` return immediately instead of waiting for `tick`
    pub fn set_free_running(&self, free: bool) {
        self.free_running.store(free, Ordering::SeqCst);
    }

    /// Signal buffer room once
    pub fn tick(&self) {
        let _ = self.tick_tx.send(());
    }

    pub fn events(&self) -> Vec<HardwareEvent> {
        self.events.lock().clone()
    }

    pub fn committed(&self) -> Vec<u32> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                HardwareEvent::Write(frames) => Some(*frames),
                _ => None,
            })
            .collect()
    }

    pub fn last_written(&self) -> Vec<f32> {
        self.last_written.lock().clone()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Stop/start calls that overlapped a buffer copy
    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    pub fn control_threads(&self) -> Vec<ThreadId> {
        self.control_threads.lock().clone()
    }

    pub fn entered_threads(&self) -> Vec<String> {
        self.entered.lock().clone()
    }

    pub fn opened_on(&self) -> Option<ThreadId> {
        *self.opened_on.lock()
    }

    /// Poll until `pred` holds, for up to two seconds
    pub fn wait_until(&self, pred: impl Fn(&Self) -> bool) -> bool {
        for _ in 0..2000 {
            if pred(self) {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    fn record_control(&self, event: HardwareEvent) {
        if self.copying.load(Ordering::SeqCst) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        self.control_threads.lock().push(thread::current().id());
        self.events.lock().push(event);
    }
}

impl Endpoint for FakeHardware {
    fn buffer_frames(&self) -> u32 {
        self.capacity
    }

    fn wait_ready(&self) -> DriverResult<()> {
        if self.free_running.load(Ordering::SeqCst) {
            thread::yield_now();
        } else {
            self.tick_rx
                .recv()
                .map_err(|_| DriverError::UnexpectedWake(u32::MAX))?;
        }

        match self.wait_failure.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn current_padding(&self) -> DriverResult<u32> {
        if let Some(err) = self.padding_failure.lock().take() {
            return Err(err);
        }
        Ok(self.paddings.lock().pop_front().unwrap_or(0))
    }

    fn write_frames(&self, frames: u32, write: &mut dyn FnMut(&mut [f32])) -> DriverResult<()> {
        let playing_before = self.playing.load(Ordering::SeqCst);
        self.copying.store(true, Ordering::SeqCst);

        let mut buffer = vec![0.0f32; frames as usize * self.channels as usize];
        write(&mut buffer);
        thread::yield_now();

        if self.playing.load(Ordering::SeqCst) != playing_before {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        self.copying.store(false, Ordering::SeqCst);

        *self.last_written.lock() = buffer;
        self.events.lock().push(HardwareEvent::Write(frames));
        Ok(())
    }

    fn start(&self) -> DriverResult<()> {
        if let Some(err) = self.start_failure.lock().take() {
            return Err(err);
        }
        self.record_control(HardwareEvent::Start);
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> DriverResult<()> {
        if let Some(err) = self.stop_failure.lock().take() {
            return Err(err);
        }
        self.record_control(HardwareEvent::Stop);
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn wake(&self) -> DriverResult<()> {
        let _ = self.tick_tx.send(());
        Ok(())
    }
}

pub(crate) struct FakeBackend {
    hardware: Arc<FakeHardware>,
    fail_enter_on: Option<&'static str>,
    fail_open: Mutex<Option<DriverError>>,
}

impl FakeBackend {
    pub fn new(hardware: &Arc<FakeHardware>) -> Self {
        Self {
            hardware: Arc::clone(hardware),
            fail_enter_on: None,
            fail_open: Mutex::new(None),
        }
    }

    /// Refuse to enter the threading context on the named thread
    pub fn fail_enter_on(mut self, thread_name: &'static str) -> Self {
        self.fail_enter_on = Some(thread_name);
        self
    }

    pub fn fail_open(self, err: DriverError) -> Self {
        *self.fail_open.lock() = Some(err);
        self
    }
}

impl Backend for FakeBackend {
    type Endpoint = Arc<FakeHardware>;
    type ThreadGuard = ();

    fn name(&self) -> &'static str {
        "Fake"
    }

    fn enter_thread(&self) -> DriverResult<()> {
        let name = thread::current().name().unwrap_or_default().to_string();
        self.hardware.entered.lock().push(name.clone());

        if self.fail_enter_on == Some(name.as_str()) {
            return Err(DriverError::ApartmentInit(format!("refused on {}", name)));
        }
        Ok(())
    }

    fn open_default(&self, format: &StreamFormat) -> DriverResult<Arc<FakeHardware>> {
        if let Some(err) = self.fail_open.lock().take() {
            return Err(err);
        }
        if format.channels != self.hardware.channels {
            return Err(DriverError::FormatMismatch);
        }
        *self.hardware.opened_on.lock() = Some(thread::current().id());
        Ok(Arc::clone(&self.hardware))
    }
}

/// Source that records every request size and fills a ramp
#[derive(Clone, Default)]
pub(crate) struct RecordingSource {
    requests: Arc<Mutex<Vec<usize>>>,
}

impl RecordingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<usize> {
        self.requests.lock().clone()
    }
}

impl SampleSource for RecordingSource {
    fn fill(&mut self, samples: &mut [f32]) {
        self.requests.lock().push(samples.len());
        for (i, s) in samples.iter_mut().enumerate() {
            *s = (i % 100) as f32 / 100.0;
        }
    }
}
