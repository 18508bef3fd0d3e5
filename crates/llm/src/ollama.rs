use async_trait::async_trait;
use resumer_common::{BackendError, Result};
use reqwest::Client;
use tracing::{debug, info};

use crate::backend::{transport_error, SummarizationBackend};
use crate::types::{OllamaOptions, OllamaRequest, OllamaResponse};

/// Ollama API backend
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl OllamaBackend {
    /// Create new Ollama backend
    ///
    /// `api_key` is sent as a bearer token, for instances behind an
    /// authenticating proxy.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        // Per-call timeouts are enforced by the retry policy
        let client = Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        info!("Ollama backend initialized: {}", base_url);
        Ok(Self {
            base_url,
            model: model.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    fn build_request(
        &self,
        system_prompt: &str,
        user_text: &str,
        max_output_tokens: u32,
    ) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            prompt: user_text.to_string(),
            system: Some(system_prompt.to_string()).filter(|s| !s.is_empty()),
            stream: Some(false),
            options: Some(OllamaOptions {
                temperature: Some(0.3),
                top_p: Some(0.9),
                num_predict: Some(i32::try_from(max_output_tokens).unwrap_or(i32::MAX)),
            }),
        }
    }
}

#[async_trait]
impl SummarizationBackend for OllamaBackend {
    async fn generate(
        &self,
        system_prompt: &str,
        user_text: &str,
        max_output_tokens: u32,
    ) -> std::result::Result<String, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = self.build_request(system_prompt, user_text, max_output_tokens);

        debug!(
            "Sending generate request to Ollama - Model: {}, Prompt length: {}",
            request.model,
            request.prompt.len()
        );

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error("Failed to send request", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), &body));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| transport_error("Failed to parse response", e))?;

        if result.response.trim().is_empty() {
            return Err(BackendError::transient("Empty response from Ollama"));
        }

        debug!("Received response from Ollama - Length: {}", result.response.len());
        Ok(result.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
