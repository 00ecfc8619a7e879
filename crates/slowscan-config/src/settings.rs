//! Settings file format and loading.

use serde::{Deserialize, Serialize};
use slowscan_dsp::{DEFAULT_SNR_DB, EngineConfig, FrequencyBand};
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::paths;

/// A band whose power density is reported alongside each estimate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BandSetting {
    /// Lower edge in Hz.
    pub low_hz: f64,
    /// Upper edge in Hz.
    pub high_hz: f64,
}

impl From<BandSetting> for FrequencyBand {
    fn from(band: BandSetting) -> Self {
        FrequencyBand::new(band.low_hz, band.high_hz)
    }
}

/// Persisted caller settings.
///
/// Every field is optional in the file; missing fields take their defaults.
///
/// # TOML Format
///
/// ```toml
/// device = "USB Audio CODEC"
/// sample_rate = 44100
/// fft_len = 2048
/// step_ms = 10.0
/// min_hz = 1500.0
/// max_hz = 2300.0
/// snr_db = 99.0
///
/// [[bands]]
/// low_hz = 1100.0
/// high_hz = 1300.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Capture device name, index, or `"default"`.
    pub device: String,

    /// Expected sample rate in Hz.
    pub sample_rate: u32,

    /// Transform length.
    pub fft_len: usize,

    /// Time between estimates in milliseconds.
    pub step_ms: f64,

    /// Lower edge of the peak search range in Hz.
    pub min_hz: f64,

    /// Upper edge of the peak search range in Hz.
    pub max_hz: f64,

    /// Signal-to-noise ratio used to pick the analysis window.
    pub snr_db: f64,

    /// Bands reported with each estimate.
    pub bands: Vec<BandSetting>,
}

impl Default for Settings {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            device: "default".to_string(),
            sample_rate: engine.sample_rate,
            fft_len: engine.fft_len,
            step_ms: 10.0,
            min_hz: 1500.0,
            max_hz: 2300.0,
            snr_db: DEFAULT_SNR_DB,
            bands: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let settings = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Parse and validate settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(toml_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load the user's settings file, or defaults if there is none.
    ///
    /// A file that exists but fails to parse is an error, not a silent
    /// fallback.
    pub fn load_or_default() -> Result<Self> {
        let path = paths::settings_path();
        if path.is_file() {
            Self::load(&path)
        } else {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            Ok(Self::default())
        }
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Engine parameters derived from these settings.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sample_rate: self.sample_rate,
            fft_len: self.fft_len,
            ..EngineConfig::default()
        }
    }

    /// Bands in the engine's representation.
    pub fn frequency_bands(&self) -> Vec<FrequencyBand> {
        self.bands.iter().copied().map(FrequencyBand::from).collect()
    }

    /// Checks the values an engine session depends on.
    pub fn validate(&self) -> Result<()> {
        if self.device.trim().is_empty() {
            return Err(ConfigError::invalid("device", "must not be empty"));
        }
        if !(self.step_ms.is_finite() && self.step_ms > 0.0) {
            return Err(ConfigError::invalid(
                "step_ms",
                format!("{} must be a positive number", self.step_ms),
            ));
        }
        if !(self.min_hz >= 0.0 && self.min_hz < self.max_hz) {
            return Err(ConfigError::invalid(
                "min_hz",
                format!("{} must be >= 0 and below max_hz ({})", self.min_hz, self.max_hz),
            ));
        }
        if self.snr_db.is_nan() {
            return Err(ConfigError::invalid("snr_db", "must be a number"));
        }
        for band in &self.bands {
            if !(band.low_hz >= 0.0 && band.low_hz < band.high_hz) {
                return Err(ConfigError::invalid(
                    "bands",
                    format!("{}..{} Hz is empty or negative", band.low_hz, band.high_hz),
                ));
            }
        }
        self.engine_config()
            .validate()
            .map_err(|e| ConfigError::invalid("engine", e.to_string()))
    }
}
