//! Write-Once Error Cell
//!
//! The render thread has no caller to return to, so its terminal failure is
//! parked here and polled by whoever owns the stream. The first error wins;
//! failures raised while the stream is already going down are discarded.

use std::sync::OnceLock;

use crate::error::DriverError;

/// Cell holding the first fatal render error
#[derive(Debug, Default)]
pub struct ErrorCell {
    slot: OnceLock<DriverError>,
}

impl ErrorCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `err` if no error has been stored yet
    ///
    /// Returns `true` if this call set the cell.
    pub fn try_store(&self, err: DriverError) -> bool {
        self.slot.set(err).is_ok()
    }

    /// First stored error, if any
    pub fn load(&self) -> Option<DriverError> {
        self.slot.get().cloned()
    }

    pub fn is_set(&self) -> bool {
        self.slot.get().is_some()
    }
}
