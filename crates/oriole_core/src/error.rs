//! Driver Error Types

use thiserror::Error;

/// Errors that can occur while opening or running an output stream
///
/// Clone is required: the render thread stores its terminal error once and
/// every poller of `current_error()` receives its own copy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    #[error("Unsupported channel count: {0} (only mono and stereo are supported)")]
    UnsupportedChannelCount(u16),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Apartment initialization failed: {0}")]
    ApartmentInit(String),

    #[error("Requested format is not supported exactly (the audio subsystem offered a closest match)")]
    FormatMismatch,

    #[error("{op} failed: {message} (HRESULT 0x{code:08X})")]
    Platform {
        op: &'static str,
        code: u32,
        message: String,
    },

    #[error("Readiness wait returned unexpected value: {0}")]
    UnexpectedWake(u32),

    #[error("Apartment worker is no longer running")]
    WorkerGone,

    #[error("Failed to spawn {name} thread: {reason}")]
    ThreadSpawn { name: String, reason: String },

    #[error("Render thread panicked")]
    RenderThreadPanicked,

    #[error("Output stream is closed")]
    Closed,

    #[error("Platform not supported")]
    UnsupportedPlatform,
}

/// Result type alias for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DriverError::UnsupportedChannelCount(6);
        assert!(err.to_string().contains('6'));

        let err = DriverError::Platform {
            op: "IAudioClient::Start",
            code: 0x8889_0004,
            message: "device invalidated".into(),
        };
        let text = err.to_string();
        assert!(text.contains("IAudioClient::Start"));
        assert!(text.contains("0x88890004"));
    }

    #[test]
    fn test_error_clone_equality() {
        let err = DriverError::UnexpectedWake(258);
        assert_eq!(err.clone(), err);
        assert_ne!(err, DriverError::FormatMismatch);
    }
}
