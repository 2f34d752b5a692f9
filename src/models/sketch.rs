//! Sketch and template data models

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// File extension every sketch carries
pub const SKETCH_EXTENSION: &str = "ino";

/// A sketch read from storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sketch {
    pub name: String,
    pub content: String,
}

/// Sketch listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SketchInfo {
    pub name: String,
    pub path: String,
    /// Seconds since the Unix epoch, as a float like the browser expects
    pub modified: f64,
    pub modified_at: DateTime<Local>,
}

/// Template listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub name: String,
    pub path: String,
}

/// Form body of `POST /api/sketch/save`
#[derive(Debug, Clone, Deserialize)]
pub struct SaveSketchForm {
    pub sketch_name: String,
    pub content: String,
}
