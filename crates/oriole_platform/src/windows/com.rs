//! COM Initialization and Management
//!
//! Provides RAII-based COM initialization for WASAPI.
//!
//! # COM Threading Model
//!
//! WASAPI requires COM to be initialized on each thread that uses it. The
//! audio client is created on the apartment thread but its padding and
//! buffer calls are made from the render thread, so both threads join the
//! multithreaded apartment (MTA), where interface pointers may be used from
//! any member thread.
//!
//! # Usage
//!
//! ```rust,no_run
//! use oriole_platform::windows::com::ComGuard;
//!
//! fn audio_thread() {
//!     // COM initialized for this thread
//!     let _com = ComGuard::new().expect("COM init failed");
//!
//!     // ... use WASAPI APIs ...
//!
//! } // COM automatically uninitialized when _com drops
//! ```

use oriole_core::{DriverError, DriverResult};
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_MULTITHREADED};

/// RAII guard for COM initialization
///
/// Initializes COM when created, uninitializes when dropped.
///
/// # Thread Safety
///
/// ComGuard is NOT Send or Sync - it must be created and dropped
/// on the same thread. This matches COM's threading requirements.
pub struct ComGuard {
    /// Marker to prevent Send/Sync (COM is thread-local)
    _not_send_sync: std::marker::PhantomData<*const ()>,
}

impl ComGuard {
    /// Join the multithreaded apartment on the current thread
    ///
    /// # Errors
    ///
    /// Fails with `RPC_E_CHANGED_MODE` if the thread already belongs to a
    /// single-threaded apartment. Repeated MTA initialization on the same
    /// thread returns S_FALSE and is balanced by the guard's drop.
    pub fn new() -> DriverResult<Self> {
        // SAFETY: CoInitializeEx is safe to call, and we track initialization
        // with the guard to ensure proper cleanup
        let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };

        // S_OK (0) = success, first init
        // S_FALSE (1) = success, already initialized (that's fine)
        // Negative = error
        if hr.is_err() {
            return Err(DriverError::ApartmentInit(format!(
                "CoInitializeEx(COINIT_MULTITHREADED) failed: {:?}",
                hr
            )));
        }

        tracing::trace!("COM (MTA) initialized for thread {:?}", std::thread::current().id());

        Ok(Self {
            _not_send_sync: std::marker::PhantomData,
        })
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        // SAFETY: We initialized COM in new(), so we must uninitialize
        unsafe {
            CoUninitialize();
        }

        tracing::trace!("COM uninitialized for thread {:?}", std::thread::current().id());
    }
}
