//! Persisted settings for slowscan callers.
//!
//! The engine itself takes an [`EngineConfig`](slowscan_dsp::EngineConfig);
//! this crate loads the values a caller keeps between runs (capture device,
//! sample rate, transform length, analysis step, search range, report bands)
//! from a TOML file and turns them into engine parameters. Settings are only
//! read here. Command-line flags override them.
//!
//! # Example
//!
//! ```rust,no_run
//! use slowscan_config::Settings;
//! use slowscan_dsp::DspEngine;
//!
//! let settings = Settings::load_or_default().unwrap();
//! let engine = DspEngine::new(settings.engine_config()).unwrap();
//! ```

mod error;
mod settings;

/// Platform-specific settings location.
pub mod paths;

pub use error::{ConfigError, Result};
pub use paths::{SETTINGS_FILE, settings_path, user_config_dir};
pub use settings::{BandSetting, Settings};
