//! Toolchain invoker
//!
//! Runs the external compiler/flasher and captures its output. Launch errors
//! (missing executable, permission denied) are returned as
//! [`Invocation::LaunchFailure`] instead of an error, so a broken toolchain
//! installation can never take down a request handler.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Semaphore;

use crate::models::ToolchainStatus;

/// Synthetic exit status reported when the executable could not be started
pub const LAUNCH_FAILURE_STATUS: i32 = 127;

/// Captured output of a toolchain process that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Result of one toolchain invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Exited(ProcessOutput),
    LaunchFailure { status: i32, reason: String },
}

impl Invocation {
    pub fn exit_status(&self) -> i32 {
        match self {
            Invocation::Exited(output) => output.exit_status,
            Invocation::LaunchFailure { status, .. } => *status,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_status() == 0
    }

    pub fn stdout_text(&self) -> String {
        match self {
            Invocation::Exited(output) => String::from_utf8_lossy(&output.stdout).into_owned(),
            Invocation::LaunchFailure { .. } => String::new(),
        }
    }

    /// Diagnostics for a failed run: stderr, or the launch error
    pub fn stderr_text(&self) -> String {
        match self {
            Invocation::Exited(output) => String::from_utf8_lossy(&output.stderr).into_owned(),
            Invocation::LaunchFailure { reason, .. } => reason.clone(),
        }
    }
}

/// Anything that can run the toolchain with an argument list
#[async_trait]
pub trait ToolchainInvoker: Send + Sync {
    async fn invoke(&self, args: &[String]) -> Invocation;
}

/// `compile --fqbn <board> --output-dir <dir> <projectDir>`
pub fn compile_args(board: &str, output_dir: &Path, project_dir: &Path) -> Vec<String> {
    vec![
        "compile".to_string(),
        "--fqbn".to_string(),
        board.to_string(),
        "--output-dir".to_string(),
        output_dir.display().to_string(),
        project_dir.display().to_string(),
    ]
}

/// `upload --fqbn <board> --port <device> <projectDir>`
pub fn upload_args(board: &str, port: &str, project_dir: &Path) -> Vec<String> {
    vec![
        "upload".to_string(),
        "--fqbn".to_string(),
        board.to_string(),
        "--port".to_string(),
        port.to_string(),
        project_dir.display().to_string(),
    ]
}

/// arduino-cli as a child process, with a cap on concurrent runs
#[derive(Clone)]
pub struct ArduinoCli {
    program: String,
    permits: Arc<Semaphore>,
}

impl ArduinoCli {
    pub fn new(program: impl Into<String>, max_concurrent: usize) -> Self {
        Self {
            program: program.into(),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Run `<program> version` and report whether the toolchain is usable
    pub async fn status(&self) -> ToolchainStatus {
        let resolved_path = which::which(&self.program)
            .ok()
            .map(|p| p.display().to_string());

        let invocation = self.invoke(&["version".to_string()]).await;
        let available = invocation.succeeded();
        let version = if available {
            invocation
                .stdout_text()
                .lines()
                .next()
                .map(|line| line.trim().to_string())
        } else {
            None
        };

        ToolchainStatus {
            program: self.program.clone(),
            available,
            version,
            resolved_path,
        }
    }
}

#[async_trait]
impl ToolchainInvoker for ArduinoCli {
    async fn invoke(&self, args: &[String]) -> Invocation {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                return Invocation::LaunchFailure {
                    status: LAUNCH_FAILURE_STATUS,
                    reason: format!("Toolchain slots unavailable: {}", e),
                };
            }
        };

        log::info!("Executing: {} {}", self.program, args.join(" "));

        let result = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(output) => {
                // Killed by a signal: no exit code, still a failure
                let exit_status = output.status.code().unwrap_or(-1);
                log::debug!("{} exited with status {}", self.program, exit_status);
                Invocation::Exited(ProcessOutput {
                    exit_status,
                    stdout: output.stdout,
                    stderr: output.stderr,
                })
            }
            Err(e) => {
                log::error!("Failed to launch {}: {}", self.program, e);
                Invocation::LaunchFailure {
                    status: LAUNCH_FAILURE_STATUS,
                    reason: format!("Failed to launch {}: {}", self.program, e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_argument_grammar() {
        let dir = PathBuf::from("/tmp/uploads/compile_blink");
        assert_eq!(
            compile_args("arduino:avr:uno", &dir, &dir),
            vec![
                "compile",
                "--fqbn",
                "arduino:avr:uno",
                "--output-dir",
                "/tmp/uploads/compile_blink",
                "/tmp/uploads/compile_blink",
            ]
        );
        assert_eq!(
            upload_args("arduino:avr:uno", "/dev/ttyACM0", &dir),
            vec![
                "upload",
                "--fqbn",
                "arduino:avr:uno",
                "--port",
                "/dev/ttyACM0",
                "/tmp/uploads/compile_blink",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_executable_is_launch_failure() {
        let cli = ArduinoCli::new("/nonexistent/sketchbrew-test/arduino-cli", 1);
        let invocation = cli.invoke(&["version".to_string()]).await;

        match &invocation {
            Invocation::LaunchFailure { status, reason } => {
                assert_eq!(*status, LAUNCH_FAILURE_STATUS);
                assert!(reason.contains("Failed to launch"));
            }
            other => panic!("Expected launch failure, got {:?}", other),
        }
        assert!(!invocation.succeeded());
        assert!(invocation.stdout_text().is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_unavailable_toolchain() {
        let cli = ArduinoCli::new("/nonexistent/sketchbrew-test/arduino-cli", 1);
        let status = cli.status().await;
        assert!(!status.available);
        assert!(status.version.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_both_streams_and_status() {
        let cli = ArduinoCli::new("sh", 1);
        let invocation = cli
            .invoke(&[
                "-c".to_string(),
                "echo out; echo err >&2; exit 3".to_string(),
            ])
            .await;

        assert_eq!(invocation.exit_status(), 3);
        assert_eq!(invocation.stdout_text(), "out\n");
        assert_eq!(invocation.stderr_text(), "err\n");
    }
}
