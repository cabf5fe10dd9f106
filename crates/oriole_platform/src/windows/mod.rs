//! Windows Platform Backend - WASAPI
//!
//! Event-driven shared-mode playback on the default render endpoint.
//!
//! # Architecture
//!
//! ```text
//! OutputDriver<Wasapi>
//!   │
//!   ├── oriole-apartment (MTA) ── open_default, Start/Stop, release
//!   │
//!   └── oriole-render (MTA) ──► ReadyEvent::wait
//!                                 └─ GetCurrentPadding ─► source ─► GetBuffer/ReleaseBuffer
//! ```
//!
//! Only 32-bit float in a `WAVEFORMATEXTENSIBLE` descriptor is requested,
//! mono or stereo. If the audio engine would substitute a closest match the
//! open fails with `FormatMismatch`.

pub mod com;
mod endpoint;
mod error;
mod event;


use oriole_core::{Backend, DriverResult, OutputDriver, StreamFormat};

pub use com::ComGuard;
pub use endpoint::{wave_format_extensible, WasapiEndpoint};
pub use event::ReadyEvent;

/// WASAPI backend
///
/// Stateless; every driver thread joins the MTA through `enter_thread`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Wasapi;

impl Backend for Wasapi {
    type Endpoint = WasapiEndpoint;
    type ThreadGuard = ComGuard;

    fn name(&self) -> &'static str {
        "WASAPI"
    }

    fn enter_thread(&self) -> DriverResult<ComGuard> {
        ComGuard::new()
    }

    fn open_default(&self, format: &StreamFormat) -> DriverResult<WasapiEndpoint> {
        WasapiEndpoint::open_default(format)
    }
}

/// Output driver on the default WASAPI render endpoint
pub type WasapiDriver = OutputDriver<Wasapi>;
