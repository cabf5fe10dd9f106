//! Apartment Worker
//!
//! A dedicated thread that owns a per-thread platform context (a COM
//! apartment on Windows) for its whole life and executes submitted jobs one
//! at a time, in submission order. Objects created inside a job stay bound to
//! this thread, so every later call on them is routed back here.
//!
//! # Architecture
//!
//! ```text
//! Caller Thread(s)                Apartment Thread
//! ────────────────                ────────────────
//! ApartmentWorker::run(job)        init() ──► guard (held until exit)
//!   │                                │
//!   ├── job_tx ─────────────────►    │ job()   (strict FIFO)
//!   │                                │
//!   └── done_rx ◄────────────────    │ send job result
//! ```
//!
//! Submission is synchronous: `run` blocks until that specific job has
//! finished. The job's return value travels back through its own completion
//! channel, so the worker loop only ever sees type-erased `FnOnce()` jobs.

use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{Receiver, Sender};

use crate::error::{DriverError, DriverResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a running apartment thread
pub struct ApartmentWorker {
    /// Job sender (caller threads → apartment thread)
    job_tx: Option<Sender<Job>>,
    /// Thread handle
    thread_handle: Option<JoinHandle<()>>,
    /// Identity of the apartment thread
    thread_id: ThreadId,
}

impl ApartmentWorker {
    /// Spawn a new apartment thread
    ///
    /// `init` runs first on the new thread; the value it returns is held for
    /// the thread's lifetime and dropped on that same thread at shutdown. If
    /// `init` fails, the thread is joined and the error returned, so no
    /// worker is left running.
    pub fn spawn<F, G>(name: &str, init: F) -> DriverResult<Self>
    where
        F: FnOnce() -> DriverResult<G> + Send + 'static,
        G: 'static,
    {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<DriverResult<()>>(1);

        let thread_handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                let _guard = match init() {
                    Ok(guard) => {
                        let _ = ready_tx.send(Ok(()));
                        guard
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                apartment_thread_main(job_rx);
            })
            .map_err(|e| DriverError::ThreadSpawn {
                name: name.into(),
                reason: e.to_string(),
            })?;

        let thread_id = thread_handle.thread().id();

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                tracing::error!("Apartment thread '{}' failed to initialize: {}", name, e);
                return Err(e);
            }
            Err(_) => {
                // init panicked before reporting
                let _ = thread_handle.join();
                return Err(DriverError::ApartmentInit(format!(
                    "'{}' exited during initialization",
                    name
                )));
            }
        }

        tracing::info!("Apartment thread '{}' spawned", name);

        Ok(Self {
            job_tx: Some(job_tx),
            thread_handle: Some(thread_handle),
            thread_id,
        })
    }

    /// Execute `job` on the apartment thread and wait for its result
    ///
    /// Fails only if the worker has shut down or the job panicked. Called
    /// from inside a job, `job` runs inline instead of deadlocking on itself.
    pub fn run<F, R>(&self, job: F) -> DriverResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if thread::current().id() == self.thread_id {
            return Ok(job());
        }

        let job_tx = self.job_tx.as_ref().ok_or(DriverError::WorkerGone)?;
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);

        job_tx
            .send(Box::new(move || {
                let _ = done_tx.send(job());
            }))
            .map_err(|_| DriverError::WorkerGone)?;

        done_rx.recv().map_err(|_| DriverError::WorkerGone)
    }

    /// Number of jobs waiting to run
    pub fn queued(&self) -> usize {
        self.job_tx.as_ref().map_or(0, |tx| tx.len())
    }

    /// Whether the caller is on the apartment thread
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Drain outstanding jobs, release the apartment and join the thread
    pub fn shutdown(&mut self) -> DriverResult<()> {
        let Some(job_tx) = self.job_tx.take() else {
            return Ok(());
        };

        // Closing the queue ends the loop once queued jobs have run
        drop(job_tx);

        if self.is_current() {
            // Last handle dropped from inside a job; the loop exits on its own
            return Ok(());
        }

        if let Some(handle) = self.thread_handle.take() {
            handle.join().map_err(|_| DriverError::WorkerGone)?;
        }

        tracing::debug!("Apartment thread shutdown complete");

        Ok(())
    }
}

impl Drop for ApartmentWorker {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn apartment_thread_main(job_rx: Receiver<Job>) {
    tracing::trace!("Apartment thread entering job loop");

    for job in job_rx.iter() {
        job();
    }

    tracing::trace!("Apartment thread job queue closed");
}
