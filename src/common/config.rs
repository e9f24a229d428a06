//! Configuration file handling

use serde::Deserialize;
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Speech-settling and page-setup timing knobs
    #[serde(default)]
    pub timings: Timings,
}

/// Timing settings in milliseconds
///
/// The debounce windows are soft: collection keeps going as long as speech
/// keeps arriving, with no hard ceiling on total wait time.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Timings {
    /// Idle window after a navigation before speech counts as settled
    #[serde(default = "default_navigation_debounce")]
    pub navigation_debounce_ms: u64,

    /// Idle window after key presses
    #[serde(default = "default_keys_debounce")]
    pub keys_debounce_ms: u64,

    /// Idle window while confirming a settings toggle
    #[serde(default = "default_mode_switch_debounce")]
    pub mode_switch_debounce_ms: u64,

    /// How long to poll for the run-test-setup control before moving on
    #[serde(default = "default_setup_button_timeout")]
    pub setup_button_timeout_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            navigation_debounce_ms: default_navigation_debounce(),
            keys_debounce_ms: default_keys_debounce(),
            mode_switch_debounce_ms: default_mode_switch_debounce(),
            setup_button_timeout_ms: default_setup_button_timeout(),
        }
    }
}

fn default_navigation_debounce() -> u64 {
    1000
}
fn default_keys_debounce() -> u64 {
    5000
}
fn default_mode_switch_debounce() -> u64 {
    750
}
fn default_setup_button_timeout() -> u64 {
    1000
}

impl Timings {
    pub fn navigation_debounce(&self) -> Duration {
        Duration::from_millis(self.navigation_debounce_ms)
    }

    pub fn keys_debounce(&self) -> Duration {
        Duration::from_millis(self.keys_debounce_ms)
    }

    pub fn mode_switch_debounce(&self) -> Duration {
        Duration::from_millis(self.mode_switch_debounce_ms)
    }

    pub fn setup_button_timeout(&self) -> Duration {
        Duration::from_millis(self.setup_button_timeout_ms)
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| super::Error::file_read(&path, &e))?;
                return toml::from_str(&content)
                    .map_err(|e| super::Error::ConfigParse(e.to_string()));
            }
        }
        Ok(Self::default())
    }
}
