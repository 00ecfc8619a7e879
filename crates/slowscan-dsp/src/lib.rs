//! Slowscan DSP - spectral engine for slow-scan television demodulation
//!
//! This crate turns a stream of mono 16-bit audio into the two measurements an
//! SSTV decoder needs at every instant: the dominant tone frequency in a band,
//! and the power density of a set of bands.
//!
//! - [`ring`] - lapped circular buffer with a mirror region
//! - [`window`] - Hann and Chebyshev window bank, SNR-based window choice
//! - [`spectrum`] - reusable real-to-complex FFT state
//! - [`estimate`] - Gaussian-interpolated peak search and band power density
//! - [`source`] - pull-based audio source contract
//! - [`session`] - session states, stop token and status events
//! - [`engine`] - [`DspEngine`], the cursor that ties them together
//! - [`worker`] - running an engine on a background thread
//!
//! ## Tracking a tone
//!
//! ```rust
//! use slowscan_dsp::{DspEngine, EngineConfig, MemorySource, WindowType};
//!
//! let rate = 44100u32;
//! let signal: Vec<f64> = (0..rate / 2)
//!     .map(|i| 0.4 * (2.0 * std::f64::consts::PI * 1900.0 * f64::from(i) / f64::from(rate)).sin())
//!     .collect();
//!
//! let mut engine = DspEngine::new(EngineConfig::default())?;
//! engine.attach(MemorySource::from_f64(&signal, rate))?;
//!
//! let window = WindowType::for_snr(30.0);
//! let hz = engine.peak_frequency(1500.0, 2300.0, window)?;
//! assert!((hz - 1900.0).abs() < engine.bin_width());
//! # Ok::<(), slowscan_dsp::Error>(())
//! ```
//!
//! ## Band power
//!
//! ```rust
//! use slowscan_dsp::{DspEngine, EngineConfig, FrequencyBand, MemorySource};
//!
//! let rate = 44100u32;
//! let signal: Vec<f64> = (0..rate / 2)
//!     .map(|i| 0.4 * (2.0 * std::f64::consts::PI * 1200.0 * f64::from(i) / f64::from(rate)).sin())
//!     .collect();
//!
//! let mut engine = DspEngine::new(EngineConfig::default())?;
//! engine.attach(MemorySource::from_f64(&signal, rate))?;
//!
//! let bands = [FrequencyBand::new(1100.0, 1300.0), FrequencyBand::new(1500.0, 2300.0)];
//! let density = engine.band_power_density(&bands)?;
//! assert!(density[0] > density[1]);
//! # Ok::<(), slowscan_dsp::Error>(())
//! ```

pub mod engine;
pub mod error;
pub mod estimate;
pub mod ring;
pub mod session;
pub mod source;
pub mod spectrum;
pub mod window;
pub mod worker;

pub use engine::{
    DEFAULT_BUFFER_CAPACITY, DEFAULT_FFT_LEN, DEFAULT_SAMPLE_RATE, DspEngine, EngineConfig,
    MOMENT_LEN, READ_CHUNK_LEN,
};
pub use error::{Error, Result};
pub use estimate::{FrequencyBand, PeakEstimate, band_power_density, find_peak, gaussian_offset};
pub use ring::LappedBuffer;
pub use session::{RateStatus, SessionState, StatusCallback, StatusEvent, StopToken};
pub use source::{AudioSource, MemorySource, ReadOutcome, ReadStatus};
pub use spectrum::SpectralEngine;
pub use window::{CHEBYSHEV_47, DEFAULT_SNR_DB, WindowBank, WindowType, hann};
pub use worker::{EngineWorker, SharedEngine};
