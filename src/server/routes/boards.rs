//! Board catalog, serial port and toolchain routes

use serde_json::json;
use std::sync::Arc;
use warp::{Filter, Reply};

use super::{error_reply, with_server_state};
use crate::config::BoardCatalog;
use crate::errors::ErrorKind;
use crate::serial::list_ports;
use crate::server::app::ServerState;

/// Create all board-related routes
pub fn create_board_routes(
    state: Arc<ServerState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let boards_list = warp::path("boards")
        .and(warp::get())
        .and(warp::path::end())
        .map(|| warp::reply::json(&json!({ "boards": BoardCatalog::as_map() })));

    let ports_list = warp::path("ports")
        .and(warp::get())
        .and(warp::path::end())
        .and_then(list_ports_handler);

    let toolchain_status = warp::path("toolchain")
        .and(warp::get())
        .and(warp::path::end())
        .and(with_server_state(state))
        .and_then(toolchain_handler);

    warp::path("api").and(boards_list.or(ports_list).or(toolchain_status))
}

/// Handler for GET /api/ports
async fn list_ports_handler() -> Result<warp::reply::Response, warp::Rejection> {
    // Port enumeration touches sysfs/IOKit synchronously
    match tokio::task::spawn_blocking(list_ports).await {
        Ok(Ok(ports)) => Ok(warp::reply::json(&json!({ "ports": ports })).into_response()),
        Ok(Err(e)) => Ok(error_reply(e.kind(), e.to_string())),
        Err(e) => Ok(error_reply(
            ErrorKind::PortUnavailable,
            format!("Port enumeration failed: {}", e),
        )),
    }
}

/// Handler for GET /api/toolchain
async fn toolchain_handler(state: Arc<ServerState>) -> Result<impl warp::Reply, warp::Rejection> {
    let status = state.orchestrator.invoker().status().await;
    Ok(warp::reply::json(&status))
}
