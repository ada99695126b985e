// src/error.rs
//! Error types for the tracker

use crate::session::TrackingState;
use std::fmt;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug)]
pub enum TrackerError {
    /// Foreground location permission was refused
    PermissionDenied,
    /// The platform location or sensor source failed
    ProviderUnavailable(String),
    /// A command was issued in a state that does not allow it
    InvalidTransition {
        state: TrackingState,
        command: &'static str,
    },
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Connection(String),
    Parse(String),
    Other(String),
}

impl TrackerError {
    /// Errors the foreground loop logs and carries on from
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TrackerError::Io(_))
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::PermissionDenied => write!(f, "Location permission denied"),
            TrackerError::ProviderUnavailable(msg) => write!(f, "Provider unavailable: {}", msg),
            TrackerError::InvalidTransition { state, command } => {
                write!(f, "Cannot {} while {}", command, state)
            }
            TrackerError::Io(e) => write!(f, "IO error: {}", e),
            TrackerError::Serial(e) => write!(f, "Serial error: {}", e),
            TrackerError::Json(e) => write!(f, "JSON error: {}", e),
            TrackerError::Connection(msg) => write!(f, "Connection error: {}", msg),
            TrackerError::Parse(msg) => write!(f, "Parse error: {}", msg),
            TrackerError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for TrackerError {}

impl From<std::io::Error> for TrackerError {
    fn from(error: std::io::Error) -> Self {
        TrackerError::Io(error)
    }
}

impl From<tokio_serial::Error> for TrackerError {
    fn from(error: tokio_serial::Error) -> Self {
        TrackerError::Serial(error)
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(error: serde_json::Error) -> Self {
        TrackerError::Json(error)
    }
}

impl From<anyhow::Error> for TrackerError {
    fn from(error: anyhow::Error) -> Self {
        TrackerError::Other(error.to_string())
    }
}
