//! Browser IDE assets
//!
//! Files live under `<data_dir>/static` and are read from disk on each
//! request, so the front end can be edited without restarting the server.

use std::path::PathBuf;
use std::sync::Arc;
use warp::{Filter, Reply};

use crate::server::app::ServerState;

/// GET / and GET /static/*
pub fn create_static_routes(
    state: Arc<ServerState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let static_dir = state.config.static_dir();

    let static_files = warp::path("static").and(warp::fs::dir(static_dir.clone()));

    let index_path = static_dir.join("index.html");
    let ide_root = warp::path::end()
        .and(warp::get())
        .and(warp::any().map(move || index_path.clone()))
        .and_then(serve_ide_root);

    ide_root.or(static_files)
}

/// Serve index.html, or a placeholder page when the assets are not installed
async fn serve_ide_root(index_path: PathBuf) -> Result<warp::reply::Response, warp::Rejection> {
    let html = match tokio::fs::read_to_string(&index_path).await {
        Ok(content) => content,
        Err(e) => {
            log::debug!("No IDE page at {}: {}", index_path.display(), e);
            create_minimal_page()
        }
    };

    Ok(warp::reply::with_header(html, "content-type", "text/html; charset=utf-8").into_response())
}

fn create_minimal_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Arduino Web IDE</title>
</head>
<body>
    <h1>Arduino Web IDE</h1>
    <p>sketchbrew {} is running. Install the IDE front end into <code>static/index.html</code>.</p>
</body>
</html>"#,
        crate::VERSION
    )
}
