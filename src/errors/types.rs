//! Typed error hierarchy for sketchbrew.
//!
//! One enum per subsystem:
//! - `SketchError` for the sketch/template file store
//! - `BuildError` for failures that stop a build before the toolchain runs
//! - `SerialError` for serial sessions and the monitor bridge
//! - `AiError` for the local model proxy
//!
//! Every enum maps onto the shared [`ErrorKind`] taxonomy so the HTTP layer
//! can render a stable `kind` tag without matching on each variant.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Client-visible error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    IoFailure,
    LaunchFailure,
    ToolchainFailure,
    PortUnavailable,
    SessionFailure,
    Unavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::IoFailure => "io_failure",
            ErrorKind::LaunchFailure => "launch_failure",
            ErrorKind::ToolchainFailure => "toolchain_failure",
            ErrorKind::PortUnavailable => "port_unavailable",
            ErrorKind::SessionFailure => "session_failure",
            ErrorKind::Unavailable => "unavailable",
        }
    }
}

/// Errors from the sketch and template store.
#[derive(Debug, Error)]
pub enum SketchError {
    #[error("Invalid sketch name: {0:?}")]
    InvalidName(String),

    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SketchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SketchError::InvalidName(_) => ErrorKind::BadRequest,
            SketchError::NotFound { .. } => ErrorKind::NotFound,
            SketchError::Io { .. } => ErrorKind::IoFailure,
        }
    }
}

/// Errors that end a build request before a toolchain outcome exists.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Sketch(#[from] SketchError),

    #[error("Failed to stage workspace at {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload requires a target port")]
    MissingPort,
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Sketch(e) => e.kind(),
            BuildError::Staging { .. } => ErrorKind::IoFailure,
            BuildError::MissingPort => ErrorKind::BadRequest,
        }
    }
}

/// Errors from serial sessions.
#[derive(Debug, Clone, Error)]
pub enum SerialError {
    #[error("Serial port {port} unavailable: {reason}")]
    PortUnavailable { port: String, reason: String },

    #[error("Serial session on {port} failed: {reason}")]
    SessionFailure { port: String, reason: String },

    #[error("Serial session on {port} is closed")]
    SessionClosed { port: String },
}

impl SerialError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SerialError::PortUnavailable { .. } => ErrorKind::PortUnavailable,
            SerialError::SessionFailure { .. } | SerialError::SessionClosed { .. } => {
                ErrorKind::SessionFailure
            }
        }
    }
}

/// Errors from the local model backend.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service not available: {0}")]
    Unavailable(String),

    #[error("AI API error: HTTP {status}")]
    Api { status: u16 },

    #[error("Invalid AI endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl AiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AiError::Unavailable(_) | AiError::Api { .. } => ErrorKind::Unavailable,
            AiError::InvalidUrl(_) => ErrorKind::BadRequest,
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_map_to_taxonomy() {
        let err = SketchError::NotFound {
            what: "Sketch",
            name: "blink.ino".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Sketch not found: blink.ino");

        let err = BuildError::from(err);
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(BuildError::MissingPort.kind(), ErrorKind::BadRequest);

        let err = SerialError::PortUnavailable {
            port: "/dev/ttyUSB0".to_string(),
            reason: "busy".to_string(),
        };
        assert_eq!(err.kind().as_str(), "port_unavailable");
    }
}
