//! Build/upload orchestrator
//!
//! Per request: `Staged -> Compiling -> {CompileFailed | CompileOk}` and, for
//! uploads, `CompileOk -> Uploading -> {UploadFailed | UploadOk}`. Upload only
//! proceeds from a [`BuildOutcome::Success`] of its own compile, so a failed
//! compile can never be flashed.
//!
//! Requests do not share state: each one stages its own workspace, and the
//! only cross-request limit is the invoker's concurrency cap.

use crate::config::BoardCatalog;
use crate::errors::BuildError;
use crate::models::{BuildOutcome, BuildPhase, BuildRequest, BuildStage};
use crate::services::sketch_store::SketchStore;
use crate::services::staging::StagingManager;
use crate::services::toolchain::{ToolchainInvoker, compile_args, upload_args};

/// Sequences staging, compile and upload for one request at a time
pub struct BuildOrchestrator<I> {
    store: SketchStore,
    staging: StagingManager,
    invoker: I,
}

impl<I: ToolchainInvoker> BuildOrchestrator<I> {
    pub fn new(store: SketchStore, staging: StagingManager, invoker: I) -> Self {
        Self {
            store,
            staging,
            invoker,
        }
    }

    pub fn staging(&self) -> &StagingManager {
        &self.staging
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Stage the sketch and compile it in place.
    ///
    /// Errors are reserved for failures before the toolchain runs (unknown
    /// sketch, unwritable workspace); toolchain failures are a `Failure` outcome.
    pub async fn compile(&self, request: &BuildRequest) -> Result<BuildOutcome, BuildError> {
        let sketch = self.store.read_sketch(&request.sketch_name).await?;
        if BoardCatalog::lookup(&request.board).is_none() {
            log::debug!("{} is not in the board catalog, passing it through", request.board);
        }

        let workspace = self.staging.stage(&sketch.content, &sketch.name).await?;
        log_phase(request, BuildPhase::Staged);
        log::debug!("{} staged as {}", request.sketch_name, workspace.name());

        log_phase(request, BuildPhase::Compiling);
        let args = compile_args(&request.board, &workspace.dir, &workspace.dir);
        let invocation = self.invoker.invoke(&args).await;

        if invocation.succeeded() {
            log_phase(request, BuildPhase::CompileOk);
            Ok(BuildOutcome::Success {
                stdout: invocation.stdout_text(),
                workspace: workspace.dir,
            })
        } else {
            log_phase(request, BuildPhase::CompileFailed);
            Ok(BuildOutcome::Failure {
                stage: BuildStage::Compile,
                stderr: invocation.stderr_text(),
                exit_status: invocation.exit_status(),
            })
        }
    }

    /// Compile, then flash the compiled workspace to `request.port`.
    ///
    /// A compile failure is returned unchanged and the upload step never runs.
    pub async fn upload(&self, request: &BuildRequest) -> Result<BuildOutcome, BuildError> {
        let port = request
            .port
            .as_deref()
            .map(str::trim)
            .filter(|port| !port.is_empty())
            .ok_or(BuildError::MissingPort)?;

        let workspace = match self.compile(request).await? {
            BuildOutcome::Success { workspace, .. } => workspace,
            failure @ BuildOutcome::Failure { .. } => return Ok(failure),
        };

        log_phase(request, BuildPhase::Uploading);
        let args = upload_args(&request.board, port, &workspace);
        let invocation = self.invoker.invoke(&args).await;

        if invocation.succeeded() {
            log_phase(request, BuildPhase::UploadOk);
            Ok(BuildOutcome::Success {
                stdout: invocation.stdout_text(),
                workspace,
            })
        } else {
            log_phase(request, BuildPhase::UploadFailed);
            Ok(BuildOutcome::Failure {
                stage: BuildStage::Upload,
                stderr: invocation.stderr_text(),
                exit_status: invocation.exit_status(),
            })
        }
    }
}

fn log_phase(request: &BuildRequest, phase: BuildPhase) {
    match phase {
        BuildPhase::CompileFailed | BuildPhase::UploadFailed => log::warn!(
            "{} [{}]: {:?}",
            request.sketch_name,
            request.board,
            phase
        ),
        _ => log::info!("{} [{}]: {:?}", request.sketch_name, request.board, phase),
    }
}
