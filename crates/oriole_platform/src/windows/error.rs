//! HRESULT to driver error conversion

use oriole_core::{DriverError, DriverResult};

/// Attach the failing operation's name to a Win32/COM error
pub(crate) trait WindowsResultExt<T> {
    fn during(self, op: &'static str) -> DriverResult<T>;
}

impl<T> WindowsResultExt<T> for windows::core::Result<T> {
    fn during(self, op: &'static str) -> DriverResult<T> {
        self.map_err(|e| platform_error(op, &e))
    }
}

pub(crate) fn platform_error(op: &'static str, err: &windows::core::Error) -> DriverError {
    DriverError::Platform {
        op,
        code: err.code().0 as u32,
        message: err.message().to_string(),
    }
}
