//! Health check route

use serde_json::json;
use std::sync::Arc;
use warp::Filter;

use super::with_server_state;
use crate::server::app::ServerState;

/// GET /health
pub fn create_health_route(
    state: Arc<ServerState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("health")
        .and(warp::get())
        .and(warp::path::end())
        .and(with_server_state(state))
        .and_then(health_handler)
}

async fn health_handler(state: Arc<ServerState>) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&json!({
        "status": "healthy",
        "version": crate::VERSION,
        "server": state.server_info().await,
    })))
}
