//! Build and upload data models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A compile or upload request. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Sketch file name in the sketch store, e.g. `blink.ino`
    pub sketch_name: String,
    /// Fully qualified board name, e.g. `arduino:avr:uno`
    pub board: String,
    /// Serial device to flash; required for upload
    pub port: Option<String>,
}

impl BuildRequest {
    pub fn compile(sketch_name: impl Into<String>, board: impl Into<String>) -> Self {
        Self {
            sketch_name: sketch_name.into(),
            board: board.into(),
            port: None,
        }
    }

    pub fn upload(
        sketch_name: impl Into<String>,
        board: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            sketch_name: sketch_name.into(),
            board: board.into(),
            port: Some(port.into()),
        }
    }
}

/// The toolchain step a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStage {
    Compile,
    Upload,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStage::Compile => write!(f, "compile"),
            BuildStage::Upload => write!(f, "upload"),
        }
    }
}

/// Progress of one request through the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Staged,
    Compiling,
    CompileFailed,
    CompileOk,
    Uploading,
    UploadFailed,
    UploadOk,
}

/// Result of a compile or upload
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Success {
        /// Toolchain stdout, verbatim
        stdout: String,
        /// Staging workspace holding the sketch and its build artifacts
        workspace: PathBuf,
    },
    Failure {
        stage: BuildStage,
        /// Toolchain stderr, or the launch error when the tool could not start
        stderr: String,
        exit_status: i32,
    },
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success { .. })
    }

    pub fn failed_stage(&self) -> Option<BuildStage> {
        match self {
            BuildOutcome::Success { .. } => None,
            BuildOutcome::Failure { stage, .. } => Some(*stage),
        }
    }
}

/// Form body of `POST /api/compile`
#[derive(Debug, Clone, Deserialize)]
pub struct CompileForm {
    pub sketch_name: String,
    pub board: String,
}

/// Form body of `POST /api/upload`
#[derive(Debug, Clone, Deserialize)]
pub struct UploadForm {
    pub sketch_name: String,
    pub board: String,
    pub port: String,
}

/// JSON body returned by the compile and upload endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<BuildStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<i32>,
}

impl BuildResponse {
    /// Render an outcome. `action` is the stage the caller asked for.
    pub fn from_outcome(action: BuildStage, outcome: &BuildOutcome) -> Self {
        match outcome {
            BuildOutcome::Success { stdout, workspace } => Self {
                success: true,
                message: match action {
                    BuildStage::Compile => "Compilation successful".to_string(),
                    BuildStage::Upload => "Upload successful".to_string(),
                },
                stage: None,
                output: Some(stdout.clone()),
                error: None,
                compile_dir: Some(workspace.display().to_string()),
                exit_status: Some(0),
            },
            BuildOutcome::Failure {
                stage,
                stderr,
                exit_status,
            } => Self {
                success: false,
                message: match stage {
                    BuildStage::Compile => "Compilation failed".to_string(),
                    BuildStage::Upload => "Upload failed".to_string(),
                },
                stage: Some(*stage),
                output: None,
                error: Some(stderr.clone()),
                compile_dir: None,
                exit_status: Some(*exit_status),
            },
        }
    }
}
