//! Local AI code assistant
//!
//! Stateless passthrough to an Ollama server. Each call first probes
//! `/api/tags` with a short timeout so an absent backend is reported quickly
//! as `Unavailable`, then issues a single non-streaming `/api/generate`. No retries.

use std::time::Duration;
use url::Url;

use crate::errors::AiError;
use crate::models::ai::{OllamaGenerateRequest, OllamaGenerateResponse, OllamaTagsResponse};

/// Ollama HTTP client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: Url,
    model: String,
    probe_timeout: Duration,
    request_timeout: Duration,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        probe_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, AiError> {
        // A trailing slash makes `join` append instead of replacing the last segment
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: Url::parse(&normalized)?,
            model: model.into(),
            probe_timeout,
            request_timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Draft Arduino code for a natural-language request
    pub async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        self.run(&generate_prompt(prompt)).await
    }

    /// Review Arduino code
    pub async fn review(&self, code: &str) -> Result<String, AiError> {
        self.run(&review_prompt(code)).await
    }

    /// Models installed on the backend, verbatim
    pub async fn models(&self) -> Result<Vec<serde_json::Value>, AiError> {
        let tags = self.probe().await?;
        Ok(tags.models)
    }

    async fn run(&self, prompt: &str) -> Result<String, AiError> {
        self.probe().await?;

        let url = self.base_url.join("api/generate")?;
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        log::debug!("Sending generate request to {} (model {})", url, self.model);
        let response = self
            .client
            .post(url)
            .json(&body)
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiError::Api {
                status: response.status().as_u16(),
            });
        }

        let generated: OllamaGenerateResponse = response.json().await?;
        Ok(generated.response)
    }

    async fn probe(&self) -> Result<OllamaTagsResponse, AiError> {
        let url = self.base_url.join("api/tags")?;
        let response = self
            .client
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| AiError::Unavailable(format!("Connection to Ollama failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AiError::Unavailable(format!(
                "Ollama service returned HTTP {}",
                response.status().as_u16()
            )));
        }

        Ok(response.json().await?)
    }
}

fn generate_prompt(request: &str) -> String {
    format!(
        r#"
You are an Arduino programming expert. Generate Arduino C/C++ code for the following request:

{request}

Requirements:
- Provide complete, working Arduino code
- Include necessary libraries and setup
- Add helpful comments
- Follow Arduino best practices
- Make the code production-ready

Arduino Code:
"#
    )
}

fn review_prompt(code: &str) -> String {
    format!(
        r#"
You are an Arduino programming expert. Please review the following Arduino code and provide:

1. Code quality assessment
2. Potential bugs or issues
3. Performance optimizations
4. Best practice recommendations
5. Security considerations (if applicable)

Arduino Code to Review:
```cpp
{code}
```

Please provide a detailed review:
"#
    )
}
