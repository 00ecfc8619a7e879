//! Error types for the spectral engine.

use thiserror::Error;

/// Errors returned by engine construction, source attachment and analysis calls.
///
/// Source exhaustion and device trouble are not errors here: they move the
/// session state (see [`SessionState`](crate::SessionState)) so the analysis
/// loop can keep running until the caller decides to stop.
#[derive(Debug, Error)]
pub enum Error {
    /// The engine configuration is inconsistent.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// An operation needed an attached audio source.
    #[error("no audio source attached")]
    NoSource,

    /// A source was attached to an engine that already left the idle state.
    #[error("an audio source is already attached")]
    AlreadyAttached,

    /// A frequency band maps outside the transform's bin range, or is empty.
    #[error("invalid frequency band {low_hz} Hz .. {high_hz} Hz: {reason}")]
    InvalidBand {
        /// Lower edge of the requested band in Hz.
        low_hz: f64,
        /// Upper edge of the requested band in Hz.
        high_hz: f64,
        /// Why the band was rejected.
        reason: &'static str,
    },

    /// A cooperative stop was requested.
    #[error("analysis cancelled")]
    Cancelled,

    /// The FFT backend rejected its buffers.
    #[error("transform failed: {0}")]
    Transform(String),

    /// The worker thread could not be started or panicked.
    #[error("engine worker failed: {0}")]
    Worker(String),
}

impl Error {
    /// Create an invalid band error.
    pub fn invalid_band(low_hz: f64, high_hz: f64, reason: &'static str) -> Self {
        Error::InvalidBand {
            low_hz,
            high_hz,
            reason,
        }
    }
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
