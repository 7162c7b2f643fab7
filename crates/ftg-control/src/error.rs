//! Error types for the control client.
//!
//! None of these are fatal: callers turn them into status strings for display
//! and the next poll cycle (or a re-click) is the retry.

use thiserror::Error;

/// Failure of a single request to the control server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, timeout, or any other I/O level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// The body was not valid JSON (or not the expected shape).
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            TransportError::HttpStatus(status.as_u16())
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}

/// Failure while persisting a credential. The token is still active for this
/// process when either variant is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("secure store write failed: {0}")]
    SecureStore(String),

    #[error("preference file write failed: {0}")]
    Preferences(String),
}

/// A lifecycle action that was refused without being sent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRejected {
    #[error("another action is already in progress")]
    Busy,

    #[error("daemon is already running")]
    AlreadyRunning,

    #[error("daemon is not running")]
    NotRunning,
}

/// Load or save of a remote settings resource failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Load failed: {0}")]
    Load(TransportError),

    #[error("Save failed: {0}")]
    Save(TransportError),
}
