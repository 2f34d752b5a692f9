//! AI assistant routes

use serde_json::json;
use std::sync::Arc;
use warp::{Filter, Reply};

use super::{MAX_FORM_BYTES, error_reply, with_server_state};
use crate::models::ai::{GenerateForm, ReviewForm};
use crate::server::app::ServerState;

/// Create all AI routes under /api/ai
pub fn create_ai_routes(
    state: Arc<ServerState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let generate = warp::path("generate")
        .and(warp::post())
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_FORM_BYTES))
        .and(warp::body::form())
        .and(with_server_state(state.clone()))
        .and_then(generate_handler);

    let review = warp::path("review")
        .and(warp::post())
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_FORM_BYTES))
        .and(warp::body::form())
        .and(with_server_state(state.clone()))
        .and_then(review_handler);

    let models = warp::path("models")
        .and(warp::get())
        .and(warp::path::end())
        .and(with_server_state(state))
        .and_then(models_handler);

    warp::path("api")
        .and(warp::path("ai"))
        .and(generate.or(review).or(models))
}

/// Handler for POST /api/ai/generate
async fn generate_handler(
    form: GenerateForm,
    state: Arc<ServerState>,
) -> Result<warp::reply::Response, warp::Rejection> {
    match state.ai.generate(&form.prompt).await {
        Ok(code) => Ok(warp::reply::json(&json!({
            "success": true,
            "code": code,
            "prompt": form.prompt,
        }))
        .into_response()),
        Err(e) => Ok(error_reply(e.kind(), e.to_string())),
    }
}

/// Handler for POST /api/ai/review
async fn review_handler(
    form: ReviewForm,
    state: Arc<ServerState>,
) -> Result<warp::reply::Response, warp::Rejection> {
    match state.ai.review(&form.code).await {
        Ok(review) => Ok(warp::reply::json(&json!({
            "success": true,
            "review": review,
        }))
        .into_response()),
        Err(e) => Ok(error_reply(e.kind(), e.to_string())),
    }
}

/// Handler for GET /api/ai/models
async fn models_handler(state: Arc<ServerState>) -> Result<warp::reply::Response, warp::Rejection> {
    match state.ai.models().await {
        Ok(models) => Ok(warp::reply::json(&json!({
            "success": true,
            "models": models,
        }))
        .into_response()),
        Err(e) => Ok(error_reply(e.kind(), e.to_string())),
    }
}
