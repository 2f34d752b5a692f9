//! Sketch and template storage routes

use serde_json::json;
use std::sync::Arc;
use warp::{Filter, Reply};

use super::{MAX_FORM_BYTES, decode_segment, error_reply, with_server_state};
use crate::models::{MessageResponse, SaveSketchForm};
use crate::server::app::ServerState;

/// Create all sketch and template routes
pub fn create_sketch_routes(
    state: Arc<ServerState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let sketches_list = warp::path("sketches")
        .and(warp::get())
        .and(warp::path::end())
        .and(with_server_state(state.clone()))
        .and_then(list_sketches_handler);

    let templates_list = warp::path("templates")
        .and(warp::get())
        .and(warp::path::end())
        .and(with_server_state(state.clone()))
        .and_then(list_templates_handler);

    // Registered before GET/DELETE /sketch/{name} so "save" is never taken as a name
    let sketch_save = warp::path("sketch")
        .and(warp::path("save"))
        .and(warp::post())
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_FORM_BYTES))
        .and(warp::body::form())
        .and(with_server_state(state.clone()))
        .and_then(save_sketch_handler);

    let sketch_get = warp::path("sketch")
        .and(warp::path::param::<String>())
        .and(warp::get())
        .and(warp::path::end())
        .and(with_server_state(state.clone()))
        .and_then(get_sketch_handler);

    let sketch_delete = warp::path("sketch")
        .and(warp::path::param::<String>())
        .and(warp::delete())
        .and(warp::path::end())
        .and(with_server_state(state.clone()))
        .and_then(delete_sketch_handler);

    let template_get = warp::path("template")
        .and(warp::path::param::<String>())
        .and(warp::get())
        .and(warp::path::end())
        .and(with_server_state(state))
        .and_then(get_template_handler);

    warp::path("api").and(
        sketches_list
            .or(templates_list)
            .or(sketch_save)
            .or(sketch_get)
            .or(sketch_delete)
            .or(template_get),
    )
}

/// Handler for GET /api/sketches
async fn list_sketches_handler(
    state: Arc<ServerState>,
) -> Result<warp::reply::Response, warp::Rejection> {
    match state.store.list_sketches() {
        Ok(sketches) => Ok(warp::reply::json(&json!({ "sketches": sketches })).into_response()),
        Err(e) => Ok(error_reply(e.kind(), e.to_string())),
    }
}

/// Handler for GET /api/templates
async fn list_templates_handler(
    state: Arc<ServerState>,
) -> Result<warp::reply::Response, warp::Rejection> {
    match state.store.list_templates() {
        Ok(templates) => Ok(warp::reply::json(&json!({ "templates": templates })).into_response()),
        Err(e) => Ok(error_reply(e.kind(), e.to_string())),
    }
}

/// Handler for GET /api/sketch/{name}
async fn get_sketch_handler(
    name: String,
    state: Arc<ServerState>,
) -> Result<warp::reply::Response, warp::Rejection> {
    match state.store.read_sketch(&decode_segment(&name)).await {
        Ok(sketch) => Ok(warp::reply::json(&sketch).into_response()),
        Err(e) => Ok(error_reply(e.kind(), e.to_string())),
    }
}

/// Handler for GET /api/template/{name}
async fn get_template_handler(
    name: String,
    state: Arc<ServerState>,
) -> Result<warp::reply::Response, warp::Rejection> {
    match state.store.read_template(&decode_segment(&name)).await {
        Ok(template) => Ok(warp::reply::json(&template).into_response()),
        Err(e) => Ok(error_reply(e.kind(), e.to_string())),
    }
}

/// Handler for POST /api/sketch/save
async fn save_sketch_handler(
    form: SaveSketchForm,
    state: Arc<ServerState>,
) -> Result<warp::reply::Response, warp::Rejection> {
    match state.store.write_sketch(&form.sketch_name, &form.content).await {
        Ok(name) => Ok(warp::reply::json(&MessageResponse {
            success: true,
            message: format!("Sketch '{}' saved successfully", name),
        })
        .into_response()),
        Err(e) => Ok(error_reply(e.kind(), e.to_string())),
    }
}

/// Handler for DELETE /api/sketch/{name}
async fn delete_sketch_handler(
    name: String,
    state: Arc<ServerState>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let name = decode_segment(&name);
    match state.store.delete_sketch(&name).await {
        Ok(()) => Ok(warp::reply::json(&MessageResponse {
            success: true,
            message: format!("Sketch '{}' deleted successfully", name),
        })
        .into_response()),
        Err(e) => Ok(error_reply(e.kind(), e.to_string())),
    }
}
