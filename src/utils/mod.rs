//! Utility functions and helpers used throughout sketchbrew

pub mod logging;
