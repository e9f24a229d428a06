//! Error types for the AT harness
//!
//! Validation problems with authored keystrokes are deliberately NOT errors
//! here: they are per-command data converted into failing results. This enum
//! covers the failures that abort a test or the whole run.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the AT harness
#[derive(Error, Debug)]
pub enum Error {
    // === Connection Errors ===
    #[error("Failed to connect to AT driver at {url}: {source}")]
    ConnectFailed {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("AT driver connection closed unexpectedly")]
    ConnectionClosed,

    #[error("No AT driver session. Create one with new_session() before issuing commands")]
    SessionNotReady,

    // === Protocol Errors ===
    #[error("AT driver protocol error: {0}")]
    Protocol(String),

    #[error("AT driver request '{method}' failed: {message}")]
    RequestFailed { method: String, message: String },

    // === Settings Errors ===
    #[error("Unrecognized {at} settings: {settings}")]
    UnknownSettings { at: String, settings: String },

    #[error("Unable to ensure proper settings for AT '{at}'")]
    SettingsNotSupported { at: String },

    #[error("Setting toggle never confirmed; expected '{desired}', heard: {spoken:?}")]
    ToggleFailed { desired: String, spoken: Vec<String> },

    // === Browser Errors ===
    #[error("Browser driver error: {0}")]
    Browser(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // === Plan/Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Invalid test plan '{path}': {error}")]
    PlanParse { path: String, error: String },

    // === Run Outcome ===
    #[error("Test run finished with {failed} failing command(s)")]
    TestRunFailed { failed: usize },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a request failed error
    pub fn request_failed(method: &str, message: &str) -> Self {
        Self::RequestFailed {
            method: method.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an unknown settings error
    pub fn unknown_settings(at: &str, settings: &str) -> Self {
        Self::UnknownSettings {
            at: at.to_string(),
            settings: settings.to_string(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
