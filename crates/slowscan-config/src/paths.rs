//! Platform-specific location of the settings file.
//!
//! - Linux: `~/.config/slowscan/settings.toml`
//! - macOS: `~/Library/Application Support/slowscan/settings.toml`
//! - Windows: `%APPDATA%\slowscan\settings.toml`

use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "slowscan";

/// File name of the persisted settings.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the path [`Settings::load_or_default`](crate::Settings::load_or_default) reads.
pub fn settings_path() -> PathBuf {
    user_config_dir().join(SETTINGS_FILE)
}
