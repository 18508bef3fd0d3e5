use async_trait::async_trait;
use resumer_common::{BackendError, Result};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::backend::{transport_error, SummarizationBackend};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Finish reasons that mean the provider refused the content
const BLOCKED_FINISH_REASONS: [&str; 4] = ["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

/// Google Gemini `generateContent` backend
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: String, endpoint: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        let endpoint = endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();

        info!("Gemini backend initialized: model={}", model);
        Ok(Self {
            client,
            api_key,
            model,
            endpoint,
        })
    }

    /// Build the request body for the generateContent API.
    fn build_request_body(
        system_prompt: &str,
        user_text: &str,
        max_output_tokens: u32,
    ) -> serde_json::Value {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": user_text }],
            }],
            "generationConfig": {
                "temperature": 0.3,
                "maxOutputTokens": max_output_tokens,
            },
        });

        if !system_prompt.is_empty() {
            body["system_instruction"] = json!({
                "parts": [{ "text": system_prompt }],
            });
        }

        body
    }

    /// Pull the generated text out of a response, rejecting blocked output
    fn parse_response(resp: &serde_json::Value) -> std::result::Result<String, BackendError> {
        if let Some(reason) = resp["promptFeedback"]["blockReason"].as_str() {
            return Err(BackendError::permanent(format!("prompt blocked by provider: {}", reason)));
        }

        let candidate = &resp["candidates"][0];
        if let Some(reason) = candidate["finishReason"].as_str() {
            if BLOCKED_FINISH_REASONS.contains(&reason) {
                return Err(BackendError::permanent(format!(
                    "content rejected by provider: {}",
                    reason
                )));
            }
        }

        let text: String = candidate["content"]["parts"]
            .as_array()
            .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(BackendError::transient("empty response from Gemini"));
        }

        Ok(text)
    }
}

#[async_trait]
impl SummarizationBackend for GeminiBackend {
    async fn generate(
        &self,
        system_prompt: &str,
        user_text: &str,
        max_output_tokens: u32,
    ) -> std::result::Result<String, BackendError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = Self::build_request_body(system_prompt, user_text, max_output_tokens);

        debug!("Gemini request to model={}, input length={}", self.model, user_text.len());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("Gemini request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), &body));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| transport_error("Failed to parse Gemini response", e))?;

        Self::parse_response(&resp)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
