//! Data models and types used throughout sketchbrew

pub mod ai;
pub mod build;
pub mod monitor;
pub mod responses;
pub mod sketch;

// Re-export commonly used types
pub use build::*;
pub use monitor::*;
pub use responses::*;
pub use sketch::*;
