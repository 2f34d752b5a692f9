//! Models for the local AI code assistant

use serde::{Deserialize, Serialize};

/// Form body of `POST /api/ai/generate`
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateForm {
    pub prompt: String,
}

/// Form body of `POST /api/ai/review`
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewForm {
    pub code: String,
}

/// Request body of Ollama's `/api/generate`
#[derive(Debug, Clone, Serialize)]
pub struct OllamaGenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

/// Response body of Ollama's `/api/generate` (non-streaming)
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaGenerateResponse {
    #[serde(default)]
    pub response: String,
}

/// Response body of Ollama's `/api/tags`
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaTagsResponse {
    #[serde(default)]
    pub models: Vec<serde_json::Value>,
}
