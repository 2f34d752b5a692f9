//! sketchbrew - Arduino Web IDE server
//!
//! sketchbrew lets a browser edit, compile, flash and live-monitor Arduino
//! sketches. It drives `arduino-cli` for builds, bridges one serial port to
//! one WebSocket client per monitor, and can proxy code generation and review
//! requests to a local Ollama model.

pub mod config;
pub mod errors;
pub mod models;
pub mod serial;
pub mod server;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use errors::*;
pub use models::*;

/// sketchbrew version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// sketchbrew application name
pub const APP_NAME: &str = "sketchbrew";
