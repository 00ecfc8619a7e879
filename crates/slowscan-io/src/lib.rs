//! Audio sources for the slowscan engine.
//!
//! This crate provides the two [`AudioSource`](slowscan_dsp::AudioSource)
//! adapters a decoder needs:
//!
//! - **File input**: [`WavSource`] streams any PCM or float WAV as mono 16-bit
//! - **Live input**: [`open_capture`] opens a capture device through cpal and
//!   returns a [`CaptureSource`] plus an [`OpenStatus`] telling whether the
//!   device runs at the requested rate
//!
//! Device listing ([`list_input_devices`]) and WAV writing ([`write_wav_i16`])
//! support the CLI and tests.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use slowscan_dsp::{DspEngine, EngineConfig, WindowType};
//! use slowscan_io::WavSource;
//!
//! let source = WavSource::open("transmission.wav")?;
//! let mut engine = DspEngine::new(EngineConfig::default())?;
//! engine.attach(source)?;
//!
//! while engine.is_listening() {
//!     let hz = engine.peak_frequency(1500.0, 2300.0, WindowType::default())?;
//!     engine.advance_ms(1.0);
//! }
//! ```

mod capture;
mod device;
mod wav;

pub use capture::CaptureSource;
pub use device::{
    DEFAULT_DEVICE, InputDevice, OpenStatus, OpenedCapture, default_input_device,
    list_input_devices, open_capture,
};
pub use wav::{WavFormat, WavInfo, WavSource, read_wav_info, write_wav_i16};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio input device available on the system.
    #[error("No audio input device available")]
    NoDevice,

    /// The requested audio device was not found or has been disconnected.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The device exists but cannot be opened for capture.
    #[error("Device unusable: {0}")]
    Unusable(String),

    /// The sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Filesystem error outside of WAV decoding.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
