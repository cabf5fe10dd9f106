//! WASAPI Shared-Mode Render Endpoint
//!
//! Opens the default render device and negotiates exactly the requested
//! float format. Setup steps, in order, each a hard failure:
//!
//! 1. Default render endpoint from the device enumerator
//! 2. Activate `IAudioClient2`
//! 3. Client properties: category "other", not offloaded
//! 4. Exact shared-mode format support (a closest match is a failure)
//! 5. Initialize: shared, event callback, no persisted settings
//! 6. Buffer capacity, render client service, readiness event
//!
//! The client is returned initialized but not started.

use std::ffi::c_void;
use std::{mem, ptr, slice};

use oriole_core::{DriverError, DriverResult, Endpoint, StreamFormat, EXTENSIBLE_EXTRA_BYTES, WAVE_FORMAT_EXTENSIBLE};
use windows::core::{GUID, HRESULT};
use windows::Win32::Foundation::{BOOL, S_FALSE};
use windows::Win32::Media::Audio::{
    eConsole, eRender, AudioCategory_Other, AudioClientProperties, IAudioClient2,
    IAudioRenderClient, IMMDeviceEnumerator, MMDeviceEnumerator, AUDCLNT_SHAREMODE_SHARED,
    AUDCLNT_STREAMFLAGS_EVENTCALLBACK, AUDCLNT_STREAMFLAGS_NOPERSIST, AUDCLNT_STREAMOPTIONS_NONE,
    WAVEFORMATEX, WAVEFORMATEXTENSIBLE, WAVEFORMATEXTENSIBLE_0,
};
use windows::Win32::System::Com::{CoCreateInstance, CoTaskMemFree, CLSCTX_ALL};

use super::error::WindowsResultExt;
use super::event::ReadyEvent;

/// KSDATAFORMAT_SUBTYPE_IEEE_FLOAT
const SUBTYPE_IEEE_FLOAT: GUID = GUID::from_u128(0x00000003_0000_0010_8000_00aa00389b71);

/// Build the extensible descriptor for a negotiated float format
pub fn wave_format_extensible(format: &StreamFormat) -> WAVEFORMATEXTENSIBLE {
    WAVEFORMATEXTENSIBLE {
        Format: WAVEFORMATEX {
            wFormatTag: WAVE_FORMAT_EXTENSIBLE,
            nChannels: format.channels,
            nSamplesPerSec: format.sample_rate,
            nAvgBytesPerSec: format.avg_bytes_per_sec,
            nBlockAlign: format.block_align,
            wBitsPerSample: StreamFormat::BITS_PER_SAMPLE,
            cbSize: EXTENSIBLE_EXTRA_BYTES,
        },
        Samples: WAVEFORMATEXTENSIBLE_0 {
            wValidBitsPerSample: StreamFormat::BITS_PER_SAMPLE,
        },
        dwChannelMask: format.channel_mask,
        SubFormat: SUBTYPE_IEEE_FLOAT,
    }
}

/// Initialized shared-mode client on the default render device
pub struct WasapiEndpoint {
    client: IAudioClient2,
    render_client: IAudioRenderClient,
    event: ReadyEvent,
    buffer_frames: u32,
    channels: usize,
}

impl WasapiEndpoint {
    /// Open the default render endpoint with exactly `format`
    ///
    /// # Requirements
    ///
    /// COM (MTA) must be initialized on the calling thread.
    pub fn open_default(format: &StreamFormat) -> DriverResult<Self> {
        tracing::debug!("Opening default render endpoint");

        let enumerator: IMMDeviceEnumerator =
            unsafe { CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL) }
                .during("CoCreateInstance(MMDeviceEnumerator)")?;

        let device = unsafe { enumerator.GetDefaultAudioEndpoint(eRender, eConsole) }
            .during("IMMDeviceEnumerator::GetDefaultAudioEndpoint")?;

        let client: IAudioClient2 =
            unsafe { device.Activate(CLSCTX_ALL, None) }.during("IMMDevice::Activate")?;

        let properties = AudioClientProperties {
            cbSize: mem::size_of::<AudioClientProperties>() as u32,
            bIsOffload: BOOL::from(false),
            eCategory: AudioCategory_Other,
            Options: AUDCLNT_STREAMOPTIONS_NONE,
        };
        unsafe { client.SetClientProperties(&properties) }
            .during("IAudioClient2::SetClientProperties")?;

        let wave_format = wave_format_extensible(format);
        let format_ptr = &wave_format as *const WAVEFORMATEXTENSIBLE as *const WAVEFORMATEX;

        ensure_exact_support(&client, format_ptr)?;

        tracing::debug!(
            "Format accepted: {} channels, {} Hz, 32-bit float, mask 0x{:X}",
            format.channels,
            format.sample_rate,
            format.channel_mask
        );

        unsafe {
            client.Initialize(
                AUDCLNT_SHAREMODE_SHARED,
                AUDCLNT_STREAMFLAGS_EVENTCALLBACK | AUDCLNT_STREAMFLAGS_NOPERSIST,
                0, // Default buffer duration (WASAPI decides)
                0, // Must be 0 for shared mode
                format_ptr,
                None,
            )
        }
        .during("IAudioClient::Initialize")?;

        let buffer_frames = unsafe { client.GetBufferSize() }.during("IAudioClient::GetBufferSize")?;

        let render_client: IAudioRenderClient =
            unsafe { client.GetService() }.during("IAudioClient::GetService(IAudioRenderClient)")?;

        let event = ReadyEvent::new()?;
        unsafe { client.SetEventHandle(event.handle()) }.during("IAudioClient::SetEventHandle")?;

        tracing::info!(
            "Render endpoint initialized: {} channels, {} frames buffer",
            format.channels,
            buffer_frames
        );

        Ok(Self {
            client,
            render_client,
            event,
            buffer_frames,
            channels: format.channels as usize,
        })
    }
}

/// Ask for exact shared-mode support of `format_ptr`
fn ensure_exact_support(client: &IAudioClient2, format_ptr: *const WAVEFORMATEX) -> DriverResult<()> {
    let mut closest: *mut WAVEFORMATEX = ptr::null_mut();

    let hr = unsafe {
        client.IsFormatSupported(AUDCLNT_SHAREMODE_SHARED, format_ptr, Some(&mut closest as *mut _))
    };

    let closest_offered = !closest.is_null();
    if closest_offered {
        // SAFETY: allocated by WASAPI with CoTaskMemAlloc
        unsafe { CoTaskMemFree(Some(closest as *const c_void)) };
    }

    classify_format_support(hr, closest_offered)
}

/// Turn an `IsFormatSupported` answer into accept or reject
///
/// WASAPI answers S_FALSE plus a closest match when it would play a
/// different format; that is a mismatch, never accepted. Only S_OK with no
/// closest match passes.
fn classify_format_support(hr: HRESULT, closest_offered: bool) -> DriverResult<()> {
    if closest_offered {
        return Err(DriverError::FormatMismatch);
    }

    hr.ok().during("IAudioClient::IsFormatSupported")?;

    if hr == S_FALSE {
        return Err(DriverError::FormatMismatch);
    }

    Ok(())
}

impl Endpoint for WasapiEndpoint {
    fn buffer_frames(&self) -> u32 {
        self.buffer_frames
    }

    fn wait_ready(&self) -> DriverResult<()> {
        self.event.wait()
    }

    fn current_padding(&self) -> DriverResult<u32> {
        unsafe { self.client.GetCurrentPadding() }.during("IAudioClient::GetCurrentPadding")
    }

    fn write_frames(&self, frames: u32, write: &mut dyn FnMut(&mut [f32])) -> DriverResult<()> {
        let data = unsafe { self.render_client.GetBuffer(frames) }
            .during("IAudioRenderClient::GetBuffer")?;

        let len = frames as usize * self.channels;

        // SAFETY: GetBuffer returned room for `frames` frames of the
        // negotiated 32-bit float format, valid until ReleaseBuffer
        let hardware = unsafe { slice::from_raw_parts_mut(data as *mut f32, len) };
        write(hardware);

        unsafe { self.render_client.ReleaseBuffer(frames, 0) }
            .during("IAudioRenderClient::ReleaseBuffer")
    }

    fn start(&self) -> DriverResult<()> {
        unsafe { self.client.Start() }.during("IAudioClient::Start")
    }

    fn stop(&self) -> DriverResult<()> {
        unsafe { self.client.Stop() }.during("IAudioClient::Stop")
    }

    fn wake(&self) -> DriverResult<()> {
        self.event.signal()
    }
}

// Rust pattern: COM interface wrappers are !Send/!Sync by default. These
// objects live in the MTA, where interface pointers are usable from any
// member thread; both driver threads join the MTA before touching them.
unsafe impl Send for WasapiEndpoint {}
unsafe impl Sync for WasapiEndpoint {}

#[cfg(test)]
mod tests {
    use super::*;

    use oriole_core::{SPEAKER_FRONT_CENTER, SPEAKER_FRONT_LEFT, SPEAKER_FRONT_RIGHT};
    use windows::Win32::Foundation::S_OK;
    use windows::Win32::Media::Audio::AUDCLNT_E_UNSUPPORTED_FORMAT;

    #[test]
    fn test_stereo_descriptor() {
        let format = StreamFormat::new(48000, 2).unwrap();
        let wfx = wave_format_extensible(&format);

        // Copy out of the packed struct before comparing
        let tag = wfx.Format.wFormatTag;
        let block_align = wfx.Format.nBlockAlign;
        let avg = wfx.Format.nAvgBytesPerSec;
        let extra = wfx.Format.cbSize;
        let mask = wfx.dwChannelMask;
        let sub_format = wfx.SubFormat;

        assert_eq!(tag, 0xFFFE);
        assert_eq!(block_align, 8);
        assert_eq!(avg, 384_000);
        assert_eq!(extra, 22);
        assert_eq!(mask, SPEAKER_FRONT_LEFT | SPEAKER_FRONT_RIGHT);
        assert_eq!(sub_format, SUBTYPE_IEEE_FLOAT);
    }

    #[test]
    fn test_mono_descriptor() {
        let format = StreamFormat::new(44100, 1).unwrap();
        let wfx = wave_format_extensible(&format);

        let channels = wfx.Format.nChannels;
        let block_align = wfx.Format.nBlockAlign;
        let mask = wfx.dwChannelMask;
        let valid_bits = unsafe { wfx.Samples.wValidBitsPerSample };

        assert_eq!(channels, 1);
        assert_eq!(block_align, 4);
        assert_eq!(mask, SPEAKER_FRONT_CENTER);
        assert_eq!(valid_bits, 32);
    }

    #[test]
    fn test_exact_support_accepted() {
        assert_eq!(classify_format_support(S_OK, false), Ok(()));
    }

    #[test]
    fn test_closest_match_is_mismatch() {
        assert_eq!(
            classify_format_support(S_FALSE, true),
            Err(DriverError::FormatMismatch)
        );
        // A closest match wins over whatever the HRESULT says
        assert_eq!(
            classify_format_support(S_OK, true),
            Err(DriverError::FormatMismatch)
        );
    }

    #[test]
    fn test_s_false_without_closest_is_mismatch() {
        assert_eq!(
            classify_format_support(S_FALSE, false),
            Err(DriverError::FormatMismatch)
        );
    }

    #[test]
    fn test_failed_query_is_platform_error() {
        match classify_format_support(AUDCLNT_E_UNSUPPORTED_FORMAT, false) {
            Err(DriverError::Platform { op, code, .. }) => {
                assert_eq!(op, "IAudioClient::IsFormatSupported");
                assert_eq!(code, 0x8889_0008);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_extension_size_matches_struct() {
        let extra = mem::size_of::<WAVEFORMATEXTENSIBLE>() - mem::size_of::<WAVEFORMATEX>();
        assert_eq!(extra, EXTENSIBLE_EXTRA_BYTES as usize);
    }
}
