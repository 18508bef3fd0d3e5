use async_trait::async_trait;
use resumer_common::{BackendConfig, BackendError, Provider, Result};
use std::sync::Arc;
use tracing::info;

use crate::gemini::GeminiBackend;
use crate::ollama::OllamaBackend;

/// Common trait for text-generation providers
#[async_trait]
pub trait SummarizationBackend: Send + Sync {
    /// Generate text for `user_text` under the given system prompt
    async fn generate(
        &self,
        system_prompt: &str,
        user_text: &str,
        max_output_tokens: u32,
    ) -> std::result::Result<String, BackendError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Create the backend selected by configuration
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn SummarizationBackend>> {
    let backend: Arc<dyn SummarizationBackend> = match config.provider {
        Provider::Gemini => Arc::new(GeminiBackend::new(
            config.credential.clone(),
            config.model.clone(),
            config.endpoint.clone(),
        )?),
        Provider::Ollama => Arc::new(OllamaBackend::new(
            config
                .endpoint
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            config.model.clone(),
            Some(config.credential.clone()),
        )?),
    };

    info!("Summarization backend: {} (model: {})", backend.name(), config.model);
    Ok(backend)
}

/// Classify a transport-level failure
pub(crate) fn transport_error(context: &str, err: reqwest::Error) -> BackendError {
    if err.is_decode() {
        BackendError::permanent(format!("{}: {}", context, err))
    } else if let Some(status) = err.status() {
        BackendError::from_status(status.as_u16(), &err.to_string())
    } else {
        // Connect/timeout/body errors
        BackendError::transient(format!("{}: {}", context, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: Provider) -> BackendConfig {
        BackendConfig {
            provider,
            credential: "key".to_string(),
            model: provider.default_model().to_string(),
            system_prompt: "Be brief.".to_string(),
            endpoint: None,
        }
    }

    #[test]
    fn test_create_backend_per_provider() {
        assert_eq!(create_backend(&config(Provider::Gemini)).unwrap().name(), "gemini");
        assert_eq!(create_backend(&config(Provider::Ollama)).unwrap().name(), "ollama");
    }
}
