//! sketchbrew HTTP/WebSocket server
//!
//! Serves the browser IDE: sketch storage, compile/upload, the serial
//! monitor bridge and the AI assistant proxy.

pub mod app;
pub mod middleware;
pub mod routes;

pub use app::*;

use anyhow::Result;

use crate::config::ServerConfig;

/// Start the server and run until Ctrl+C
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let app = ServerApp::new(config).await?;
    app.run().await
}
