//! Platform configuration paths

use std::path::PathBuf;

const APP_NAME: &str = "at-harness";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/at-harness/`
/// - macOS: `~/Library/Application Support/at-harness/`
/// - Windows: `%APPDATA%\at-harness\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
