//! Buffer Readiness Event
//!
//! Auto-reset kernel event registered with the audio client. WASAPI signals
//! it whenever the hardware buffer has room; the render thread is its only
//! waiter. The driver also signals it by hand to release the render thread
//! at close.

use oriole_core::{DriverError, DriverResult};
use windows::core::{Error, PCWSTR};
use windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_FAILED, WAIT_OBJECT_0};
use windows::Win32::System::Threading::{CreateEventW, SetEvent, WaitForSingleObject, INFINITE};

use super::error::{platform_error, WindowsResultExt};

/// Owned auto-reset event handle
pub struct ReadyEvent {
    handle: HANDLE,
}

impl ReadyEvent {
    /// Create an unsignaled auto-reset event
    pub fn new() -> DriverResult<Self> {
        // SAFETY: no security attributes, no name; the handle is owned by
        // the returned value and closed on drop
        let handle = unsafe { CreateEventW(None, false, false, PCWSTR::null()) }.during("CreateEventW")?;

        Ok(Self { handle })
    }

    pub fn handle(&self) -> HANDLE {
        self.handle
    }

    /// Block until signaled
    pub fn wait(&self) -> DriverResult<()> {
        // SAFETY: the handle stays valid for the lifetime of self
        let result = unsafe { WaitForSingleObject(self.handle, INFINITE) };

        if result == WAIT_OBJECT_0 {
            Ok(())
        } else if result == WAIT_FAILED {
            Err(platform_error("WaitForSingleObject", &Error::from_win32()))
        } else {
            Err(DriverError::UnexpectedWake(result.0))
        }
    }

    /// Signal the event, releasing one waiter
    pub fn signal(&self) -> DriverResult<()> {
        // SAFETY: the handle stays valid for the lifetime of self
        unsafe { SetEvent(self.handle) }.during("SetEvent")
    }
}

impl Drop for ReadyEvent {
    fn drop(&mut self) {
        // SAFETY: we own the handle and nothing uses it after drop
        if let Err(e) = unsafe { CloseHandle(self.handle) } {
            tracing::debug!("CloseHandle on readiness event failed: {}", e);
        }
    }
}

// Rust pattern: HANDLE wraps a raw pointer and is !Send/!Sync, but kernel
// event handles are process-wide and valid on any thread
unsafe impl Send for ReadyEvent {}
unsafe impl Sync for ReadyEvent {}
