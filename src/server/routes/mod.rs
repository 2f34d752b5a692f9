//! HTTP routes for the sketchbrew server

pub mod ai;
pub mod boards;
pub mod build;
pub mod health;
pub mod monitor;
pub mod sketches;
pub mod static_files;

use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Reply};

use crate::errors::ErrorKind;
use crate::models::ErrorResponse;
use crate::server::app::ServerState;

/// Largest accepted form body (sketch source, AI prompts)
pub const MAX_FORM_BYTES: u64 = 4 * 1024 * 1024;

/// Create all server routes
pub fn create_routes(
    state: Arc<ServerState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let api_routes = boards::create_board_routes(state.clone())
        .or(sketches::create_sketch_routes(state.clone()))
        .or(build::create_build_routes(state.clone()))
        .or(ai::create_ai_routes(state.clone()));

    health::create_health_route(state.clone())
        .or(api_routes)
        .or(monitor::create_monitor_routes(state.clone()))
        .or(static_files::create_static_routes(state))
}

/// Helper function to pass server state to handlers
pub(crate) fn with_server_state(
    state: Arc<ServerState>,
) -> impl Filter<Extract = (Arc<ServerState>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}

/// JSON error body with the status its kind maps to
pub(crate) fn error_reply(kind: ErrorKind, message: impl Into<String>) -> warp::reply::Response {
    let status = match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Unavailable | ErrorKind::PortUnavailable | ErrorKind::SessionFailure => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ErrorKind::IoFailure | ErrorKind::LaunchFailure | ErrorKind::ToolchainFailure => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let message = message.into();
    if status.is_server_error() {
        log::warn!("{}: {}", kind.as_str(), message);
    }

    warp::reply::with_status(
        warp::reply::json(&ErrorResponse::new(kind, message)),
        status,
    )
    .into_response()
}

/// Percent-decode one path segment, keeping it as-is if it is not valid UTF-8
pub(crate) fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}
