//! Oriole Platform - OS-Specific Audio Output
//!
//! This crate provides the platform backends for `oriole_core`:
//! - Default render endpoint discovery
//! - Exact-format negotiation in shared mode
//! - Event-driven buffer readiness
//!
//! # Platform Support
//!
//! | Platform | Backend | Mode                 |
//! |----------|---------|----------------------|
//! | Windows  | WASAPI  | Shared, event-driven |
//!
//! Callers that fail to open a stream here are expected to fall back to a
//! different output path entirely; formats are never silently substituted.

#[cfg(target_os = "windows")]
pub mod windows;

use oriole_core::{DriverConfig, DriverResult, OutputStream, SampleSource};

/// Open the platform's default output with exactly the requested format
///
/// Returns a boxed stream that is already playing.
pub fn open_default_output<S: SampleSource>(
    config: DriverConfig,
    source: S,
) -> DriverResult<Box<dyn OutputStream>> {
    config.validate()?;

    #[cfg(target_os = "windows")]
    {
        let driver = windows::WasapiDriver::new(windows::Wasapi, config, source)?;
        Ok(Box::new(driver))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let _ = source;
        Err(oriole_core::DriverError::UnsupportedPlatform)
    }
}

/// Name of the backend `open_default_output` uses on this platform
pub fn default_backend_name() -> Option<&'static str> {
    #[cfg(target_os = "windows")]
    {
        Some("WASAPI")
    }
    #[cfg(not(target_os = "windows"))]
    {
        None
    }
}

/// Whether `open_default_output` can succeed on this platform at all
pub fn is_supported() -> bool {
    default_backend_name().is_some()
}
