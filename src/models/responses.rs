//! API response models and server information structures

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::errors::ErrorKind;

/// Uniform error body for failed API calls
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub kind: ErrorKind,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            kind,
            error: error.into(),
        }
    }
}

/// Simple success acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Serial port as reported by the OS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortInfo {
    pub device: String,
    pub name: String,
    pub description: String,
    pub hwid: String,
}

/// Result of probing the toolchain executable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainStatus {
    pub program: String,
    pub available: bool,
    pub version: Option<String>,
    pub resolved_path: Option<String>,
}

/// Server information included in the health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub version: String,
    pub hostname: String,
    pub started_at: DateTime<Local>,
    pub open_sessions: usize,
}
