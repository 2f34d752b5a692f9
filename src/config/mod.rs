//! Configuration management for sketchbrew

pub mod app_config;
pub mod boards;

pub use app_config::*;
pub use boards::*;
