//! Error types for sketchbrew

pub mod types;

pub use types::*;
