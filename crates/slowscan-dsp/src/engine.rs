//! The demodulation engine: buffer, cursor, windowing and estimation in one owner.
//!
//! [`DspEngine`] owns the lapped buffer, the window bank and the transform
//! state, and pulls from exactly one [`AudioSource`]. Advancing the cursor is
//! the unit of simulated time: the cursor only moves while more than
//! [`MOMENT_LEN`] samples remain ahead of it and refills first otherwise, so
//! every analysis sees a full span of valid samples while the source is live.
//!
//! ## Usage
//!
//! ```rust
//! use slowscan_dsp::{DspEngine, EngineConfig, MemorySource, WindowType};
//!
//! let rate = 44100;
//! let tone: Vec<f64> = (0..rate)
//!     .map(|i| 0.5 * (2.0 * std::f64::consts::PI * 1200.0 * i as f64 / rate as f64).sin())
//!     .collect();
//!
//! let mut engine = DspEngine::new(EngineConfig::default())?;
//! engine.attach(MemorySource::from_f64(&tone, rate as u32))?;
//!
//! while engine.is_listening() {
//!     let hz = engine.peak_frequency(1000.0, 1400.0, WindowType::Hann511)?;
//!     assert!((hz - 1200.0).abs() < engine.bin_width());
//!     engine.advance_ms(100.0);
//! }
//! # Ok::<(), slowscan_dsp::Error>(())
//! ```

use crate::estimate::{self, FrequencyBand, PeakEstimate};
use crate::ring::LappedBuffer;
use crate::session::{RateStatus, SessionState, StatusCallback, StatusEvent, StopToken};
use crate::source::{AudioSource, ReadStatus};
use crate::spectrum::SpectralEngine;
use crate::window::{WindowBank, WindowType};
use crate::{Error, Result};

/// Samples in one analysis span, and the lookback margin kept ahead of the cursor.
pub const MOMENT_LEN: usize = 2047;

/// Nominal sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default transform length.
pub const DEFAULT_FFT_LEN: usize = 2048;

/// Default ring capacity in samples.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Samples requested from the source per refill.
pub const READ_CHUNK_LEN: usize = 1024;

/// Engine construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Expected source sample rate in Hz.
    pub sample_rate: u32,
    /// Transform length `N`.
    pub fft_len: usize,
    /// Ring capacity `C` in samples.
    pub buffer_capacity: usize,
    /// Samples requested per refill.
    pub read_chunk: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            fft_len: DEFAULT_FFT_LEN,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            read_chunk: READ_CHUNK_LEN,
        }
    }
}

impl EngineConfig {
    /// Default configuration at a different sample rate.
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Checks that the parameters can work together.
    ///
    /// - the sample rate is non-zero
    /// - the transform is longer than the widest window
    /// - one refill on top of a full lookback margin fits in the ring
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample rate must be > 0".into()));
        }
        if self.fft_len <= WindowType::MAX_LEN {
            return Err(Error::InvalidConfig(format!(
                "transform length {} must exceed the widest window ({})",
                self.fft_len,
                WindowType::MAX_LEN
            )));
        }
        if self.read_chunk == 0 {
            return Err(Error::InvalidConfig("read chunk must be > 0".into()));
        }
        if self.buffer_capacity < MOMENT_LEN + self.read_chunk {
            return Err(Error::InvalidConfig(format!(
                "buffer capacity {} must hold the lookback margin ({}) plus one read chunk ({})",
                self.buffer_capacity, MOMENT_LEN, self.read_chunk
            )));
        }
        Ok(())
    }
}

/// Lapped-buffer spectral engine bound to one audio source.
pub struct DspEngine {
    config: EngineConfig,
    ring: LappedBuffer,
    windows: WindowBank,
    spectrum: SpectralEngine,
    moment: Vec<f64>,
    read_buf: Vec<i16>,
    source: Option<Box<dyn AudioSource>>,
    state: SessionState,
    stop: StopToken,
    rate_status: RateStatus,
    sample_rate: f64,
    consumed: u64,
    received: u64,
    dropped: u64,
    on_status: Option<StatusCallback>,
}

impl DspEngine {
    /// Builds an idle engine.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let sample_rate = f64::from(config.sample_rate);
        tracing::debug!(
            sample_rate = config.sample_rate,
            fft_len = config.fft_len,
            capacity = config.buffer_capacity,
            "engine created"
        );

        Ok(Self {
            config,
            ring: LappedBuffer::new(config.buffer_capacity),
            windows: WindowBank::new(),
            spectrum: SpectralEngine::new(config.fft_len, sample_rate),
            moment: vec![0.0; MOMENT_LEN],
            read_buf: vec![0; config.read_chunk],
            source: None,
            state: SessionState::Idle,
            stop: StopToken::new(),
            rate_status: RateStatus::Matched,
            sample_rate,
            consumed: 0,
            received: 0,
            dropped: 0,
            on_status: None,
        })
    }

    /// Registers the callback that receives [`StatusEvent`]s.
    pub fn set_status_callback(&mut self, callback: StatusCallback) {
        self.on_status = Some(callback);
    }

    /// Attaches the audio source and starts listening.
    ///
    /// If the source's rate differs from the configured one the engine records
    /// [`RateStatus::Mismatch`], reports it, and converts with the source's
    /// actual rate from then on. The buffer is primed until the lookback margin
    /// is filled or the source ends.
    pub fn attach<S: AudioSource + 'static>(&mut self, source: S) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(Error::AlreadyAttached);
        }

        let actual = source.sample_rate();
        if actual == 0 {
            return Err(Error::InvalidConfig("source reports a 0 Hz sample rate".into()));
        }

        self.rate_status = RateStatus::compare(self.config.sample_rate, actual);
        if let RateStatus::Mismatch { expected, actual } = self.rate_status {
            tracing::warn!(expected, actual, "source sample rate differs, expect degraded accuracy");
            self.emit(StatusEvent::RateMismatch { expected, actual });
        }
        self.sample_rate = f64::from(actual);
        self.spectrum.set_sample_rate(self.sample_rate);

        tracing::info!(source = %source.describe(), sample_rate = actual, "audio source attached");
        self.source = Some(Box::new(source));
        self.state = SessionState::Listening;

        self.restore_margin(MOMENT_LEN);
        Ok(())
    }

    /// Pulls up to one chunk from the source into the buffer.
    ///
    /// Never fails: exhaustion, device errors and stop requests move the
    /// session state, so check [`is_listening`](Self::is_listening) afterwards.
    /// Returns the number of samples stored.
    pub fn refill(&mut self) -> usize {
        if self.state != SessionState::Listening || self.poll_stop() {
            return 0;
        }

        let outcome = match self.source.as_mut() {
            Some(source) => source.read(&mut self.read_buf),
            None => return 0,
        };

        let count = outcome.count.min(self.read_buf.len());
        self.ring.write(&self.read_buf[..count]);
        self.received += count as u64;
        tracing::trace!(count, fill = self.ring.fill_count(), "refill");

        match outcome.status {
            ReadStatus::Ok => {}
            ReadStatus::Dropped(lost) => {
                self.dropped += lost;
                tracing::warn!(dropped = lost, total = self.dropped, "source dropped samples");
                self.emit(StatusEvent::SamplesDropped {
                    count: lost,
                    total: self.dropped,
                });
            }
            ReadStatus::Exhausted => {
                tracing::info!(
                    received = self.received,
                    elapsed_s = self.elapsed(),
                    "audio source exhausted"
                );
                self.state = SessionState::Exhausted;
                self.emit(StatusEvent::Exhausted);
            }
            ReadStatus::Failed(reason) => {
                tracing::error!(%reason, "audio source failed");
                self.state = SessionState::Exhausted;
                self.emit(StatusEvent::SourceError(reason));
            }
        }

        count
    }

    /// Refills until at least `target` samples lie ahead of the cursor.
    ///
    /// Empty reads from a stalled source are retried; the loop only gives up
    /// when the session leaves `Listening` (end of input, device failure or a
    /// stop request). Returns whether the target was reached.
    fn restore_margin(&mut self, target: usize) -> bool {
        let mut stalls = 0u64;
        while self.ring.fill_count() < target {
            if self.state != SessionState::Listening {
                return false;
            }
            if self.refill() == 0 && self.state == SessionState::Listening {
                stalls += 1;
                if stalls == 1 {
                    tracing::debug!(fill = self.ring.fill_count(), "source stalled, waiting for samples");
                }
            }
        }
        if stalls > 0 {
            tracing::debug!(stalls, "source resumed");
        }
        true
    }

    /// Moves the cursor forward by `n` samples.
    ///
    /// The cursor never moves past the lookback margin: once only
    /// [`MOMENT_LEN`] samples remain ahead of it, the buffer is refilled
    /// (waiting out empty reads) before consumption continues. Stops early
    /// once the session leaves `Listening`. Returns elapsed time in seconds for
    /// the samples actually consumed.
    pub fn advance(&mut self, n: usize) -> f64 {
        let mut remaining = n;
        let mut consumed = 0usize;

        while remaining > 0 && self.state == SessionState::Listening && !self.poll_stop() {
            if !self.restore_margin(MOMENT_LEN + 1) {
                break;
            }

            let step = (self.ring.fill_count() - MOMENT_LEN).min(remaining);
            self.ring.consume(step);
            remaining -= step;
            consumed += step;
        }

        self.consumed += consumed as u64;
        consumed as f64 / self.sample_rate
    }

    /// Moves the cursor forward by one sample.
    pub fn advance_one(&mut self) -> f64 {
        self.advance(1)
    }

    /// Moves the cursor forward by `ms` milliseconds, rounded to whole samples.
    pub fn advance_ms(&mut self, ms: f64) -> f64 {
        let n = (ms / 1000.0 * self.sample_rate).round();
        if n.is_nan() || n <= 0.0 {
            return 0.0;
        }
        self.advance(n as usize)
    }

    /// Peak frequency in Hz within `[min_hz, max_hz)`, refined to sub-bin accuracy.
    pub fn peak_frequency(&mut self, min_hz: f64, max_hz: f64, window: WindowType) -> Result<f64> {
        self.peak(min_hz, max_hz, window).map(|p| p.frequency_hz)
    }

    /// Full peak search result, including the coarse bin and whether
    /// interpolation succeeded.
    pub fn peak(&mut self, min_hz: f64, max_hz: f64, window: WindowType) -> Result<PeakEstimate> {
        self.transform_moment(window)?;
        estimate::find_peak(&self.spectrum, min_hz, max_hz)
    }

    /// Power per Hz in each band, measured through the widest window.
    pub fn band_power_density(&mut self, bands: &[FrequencyBand]) -> Result<Vec<f64>> {
        self.transform_moment(WindowType::Hann1023)?;
        estimate::band_power_density(&self.spectrum, bands)
    }

    /// Windows the span at the cursor and transforms it.
    fn transform_moment(&mut self, window: WindowType) -> Result<()> {
        if self.source.is_none() {
            return Err(Error::NoSource);
        }
        if self.poll_stop() {
            return Err(Error::Cancelled);
        }

        let span = self.ring.window(MOMENT_LEN);
        let taps = self.windows.apply(window, span, &mut self.moment);
        self.spectrum.transform(&self.moment[..taps])?;
        Ok(())
    }

    /// Observes the stop flag, moving a live session to `Aborted`.
    fn poll_stop(&mut self) -> bool {
        if !self.stop.is_stop_requested() {
            return false;
        }
        if !self.state.is_terminal() {
            tracing::info!(elapsed_s = self.elapsed(), "stop requested, aborting session");
            self.state = SessionState::Aborted;
            self.emit(StatusEvent::Aborted);
        }
        true
    }

    fn emit(&mut self, event: StatusEvent) {
        if let Some(callback) = self.on_status.as_mut() {
            callback(&event);
        }
    }

    /// Token that requests a cooperative stop from any thread.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Requests a cooperative stop.
    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the source is still delivering samples.
    pub fn is_listening(&self) -> bool {
        self.state == SessionState::Listening
    }

    /// Whether the source rate matched the configured rate.
    pub fn rate_status(&self) -> RateStatus {
        self.rate_status
    }

    /// Sample rate used for every conversion: the source's rate once attached.
    pub fn effective_sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Width of one transform bin in Hz.
    pub fn bin_width(&self) -> f64 {
        self.spectrum.bin_width()
    }

    /// Bin index of a frequency (truncated, unclamped).
    pub fn bin_of(&self, freq_hz: f64) -> isize {
        self.spectrum.bin_of(freq_hz)
    }

    /// Seconds consumed since attach.
    pub fn elapsed(&self) -> f64 {
        self.consumed as f64 / self.sample_rate
    }

    /// Samples consumed since attach.
    pub fn consumed_samples(&self) -> u64 {
        self.consumed
    }

    /// Samples received from the source since attach.
    pub fn received_samples(&self) -> u64 {
        self.received
    }

    /// Samples the source reported as lost.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped
    }

    /// Valid samples ahead of the cursor.
    pub fn fill_count(&self) -> usize {
        self.ring.fill_count()
    }

    /// The lapped buffer, for inspection.
    pub fn buffer(&self) -> &LappedBuffer {
        &self.ring
    }

    /// Construction parameters.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl std::fmt::Debug for DspEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DspEngine")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("rate_status", &self.rate_status)
            .field("fill", &self.ring.fill_count())
            .field("consumed", &self.consumed)
            .finish_non_exhaustive()
    }
}
