//! Compile and upload routes

use std::sync::Arc;
use warp::{Filter, Reply};

use super::{MAX_FORM_BYTES, error_reply, with_server_state};
use crate::errors::ErrorKind;
use crate::models::{BuildRequest, BuildResponse, BuildStage, CompileForm, UploadForm};
use crate::server::app::ServerState;

/// Create compile and upload routes
pub fn create_build_routes(
    state: Arc<ServerState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let compile = warp::path("compile")
        .and(warp::post())
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_FORM_BYTES))
        .and(warp::body::form())
        .and(with_server_state(state.clone()))
        .and_then(compile_handler);

    let upload = warp::path("upload")
        .and(warp::post())
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_FORM_BYTES))
        .and(warp::body::form())
        .and(with_server_state(state))
        .and_then(upload_handler);

    warp::path("api").and(compile.or(upload))
}

/// Handler for POST /api/compile
async fn compile_handler(
    form: CompileForm,
    state: Arc<ServerState>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let request = BuildRequest::compile(form.sketch_name, form.board);
    Ok(run_build(state, request, BuildStage::Compile).await)
}

/// Handler for POST /api/upload
async fn upload_handler(
    form: UploadForm,
    state: Arc<ServerState>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let request = BuildRequest::upload(form.sketch_name, form.board, form.port);
    Ok(run_build(state, request, BuildStage::Upload).await)
}

async fn run_build(
    state: Arc<ServerState>,
    request: BuildRequest,
    action: BuildStage,
) -> warp::reply::Response {
    // The build runs on its own task so a client disconnect does not kill the toolchain
    let build = tokio::spawn(async move {
        match action {
            BuildStage::Compile => state.orchestrator.compile(&request).await,
            BuildStage::Upload => state.orchestrator.upload(&request).await,
        }
    });

    match build.await {
        Ok(Ok(outcome)) => {
            warp::reply::json(&BuildResponse::from_outcome(action, &outcome)).into_response()
        }
        Ok(Err(e)) => error_reply(e.kind(), e.to_string()),
        Err(e) => error_reply(ErrorKind::IoFailure, format!("Build task failed: {}", e)),
    }
}
