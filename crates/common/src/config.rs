use crate::error::ResumerError;
use crate::retry::RetryPolicy;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default instructions sent to every backend call
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a document summarizer. Create a concise summary of the provided text.

Requirements:
- Keep the summary brief and scannable for mobile reading
- Use bullet points for key information
- Highlight the most important facts and dates
- Format for Telegram (use simple markdown: *bold*, _italic_)
- Keep lines short; no tables, no headings, no code blocks
- Write in the same language as the source document"#;

/// Hosted text-generation provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    Ollama,
}

impl Provider {
    /// Model used when `MODEL_NAME` is not set
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::Ollama => "llama3.2:latest",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }
}

impl FromStr for Provider {
    type Err = ResumerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(ResumerError::config(format!(
                "Unsupported model provider: {} (expected gemini or ollama)",
                other
            ))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generation backend settings, immutable after load
#[derive(Clone)]
pub struct BackendConfig {
    pub provider: Provider,

    /// API key for the provider
    pub credential: String,

    pub model: String,

    pub system_prompt: String,

    /// Override for the provider's API base URL
    pub endpoint: Option<String>,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("provider", &self.provider)
            .field("credential", &"<redacted>")
            .field("model", &self.model)
            .field("system_prompt", &format!("<{} chars>", self.system_prompt.chars().count()))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Telegram delivery settings
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,

    /// Recipient chat id
    pub chat_id: String,

    /// `Markdown`, `MarkdownV2`, `HTML`, or `None` for plain text
    pub parse_mode: Option<String>,

    pub api_base: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("parse_mode", &self.parse_mode)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Chunking and map/reduce policy values
#[derive(Debug, Clone, Serialize)]
pub struct SummaryPolicy {
    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters repeated between consecutive chunks
    pub chunk_overlap: usize,

    /// Concurrent map-phase backend calls
    pub max_concurrency: usize,

    /// Fraction of failed chunks above which summarization fails
    pub max_failed_ratio: f64,

    /// Maximum length of the final summary in characters
    pub target_length: usize,

    pub map_max_tokens: u32,

    pub reduce_max_tokens: u32,
}

impl Default for SummaryPolicy {
    fn default() -> Self {
        Self {
            chunk_size: 12_000,
            chunk_overlap: 400,
            max_concurrency: 4,
            max_failed_ratio: 0.5,
            target_length: 3_500,
            map_max_tokens: 512,
            reduce_max_tokens: 1_024,
        }
    }
}

/// Resumer application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Document to summarize when none is given on the command line
    pub document_path: Option<PathBuf>,

    pub backend: BackendConfig,

    pub telegram: TelegramConfig,

    pub summary: SummaryPolicy,

    pub retry: RetryPolicy,

    /// Log directory; console only when unset
    pub log_dir: Option<PathBuf>,

    /// Log level
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, ResumerError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ResumerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| {
                ResumerError::config(format!("Missing required environment variable: {}", key))
            })
        };

        let bot_token = require("TELEGRAM_BOT_TOKEN")?;
        let chat_id = require("CHAT_ID")?;
        let credential = require("MODEL_API_KEY")?;

        let provider = match get("MODEL_PROVIDER") {
            Some(p) => p.parse()?,
            None => Provider::Gemini,
        };

        let system_prompt = match (get("SYSTEM_PROMPT"), get("SYSTEM_PROMPT_FILE")) {
            (Some(prompt), _) => prompt,
            (None, Some(path)) => std::fs::read_to_string(&path).map_err(|e| {
                ResumerError::config(format!("Failed to read system prompt file {}: {}", path, e))
            })?,
            (None, None) => DEFAULT_SYSTEM_PROMPT.to_string(),
        };

        let defaults = SummaryPolicy::default();
        let retry_defaults = RetryPolicy::default();

        let config = Self {
            document_path: get("DOCUMENT_PATH").map(PathBuf::from),
            backend: BackendConfig {
                provider,
                credential,
                model: get("MODEL_NAME").unwrap_or_else(|| provider.default_model().to_string()),
                system_prompt,
                endpoint: get("MODEL_ENDPOINT"),
            },
            telegram: TelegramConfig {
                bot_token,
                chat_id,
                parse_mode: match get("TELEGRAM_PARSE_MODE") {
                    Some(mode) if mode.eq_ignore_ascii_case("none") => None,
                    Some(mode) => Some(mode),
                    None => Some("Markdown".to_string()),
                },
                api_base: get("TELEGRAM_API_BASE")
                    .unwrap_or_else(|| "https://api.telegram.org".to_string()),
            },
            summary: SummaryPolicy {
                chunk_size: parse_or(&get, "CHUNK_SIZE", defaults.chunk_size)?,
                chunk_overlap: parse_or(&get, "CHUNK_OVERLAP", defaults.chunk_overlap)?,
                max_concurrency: parse_or(&get, "MAX_CONCURRENCY", defaults.max_concurrency)?,
                max_failed_ratio: parse_or(&get, "MAX_FAILED_RATIO", defaults.max_failed_ratio)?,
                target_length: parse_or(&get, "TARGET_SUMMARY_CHARS", defaults.target_length)?,
                map_max_tokens: parse_or(&get, "MAP_MAX_TOKENS", defaults.map_max_tokens)?,
                reduce_max_tokens: parse_or(&get, "REDUCE_MAX_TOKENS", defaults.reduce_max_tokens)?,
            },
            retry: RetryPolicy {
                max_attempts: parse_or(&get, "MAX_ATTEMPTS", retry_defaults.max_attempts)?,
                base_delay: parse_or(&get, "RETRY_BASE_DELAY_MS", None::<u64>)?
                    .map(Duration::from_millis)
                    .unwrap_or(retry_defaults.base_delay),
                call_timeout: parse_or(&get, "CALL_TIMEOUT_SECS", None::<u64>)?
                    .map(Duration::from_secs)
                    .unwrap_or(retry_defaults.call_timeout),
            },
            log_dir: get("LOG_DIR").map(PathBuf::from),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ResumerError> {
        let summary = &self.summary;

        if summary.chunk_size == 0 {
            return Err(ResumerError::config("CHUNK_SIZE must be greater than 0"));
        }

        if summary.chunk_overlap >= summary.chunk_size {
            return Err(ResumerError::config("CHUNK_OVERLAP must be smaller than CHUNK_SIZE"));
        }

        if summary.max_concurrency == 0 {
            return Err(ResumerError::config("MAX_CONCURRENCY must be at least 1"));
        }

        if !(0.0..=1.0).contains(&summary.max_failed_ratio) {
            return Err(ResumerError::config("MAX_FAILED_RATIO must be between 0 and 1"));
        }

        if summary.target_length < 100 {
            return Err(ResumerError::config("TARGET_SUMMARY_CHARS must be at least 100"));
        }

        if self.retry.max_attempts == 0 {
            return Err(ResumerError::config("MAX_ATTEMPTS must be at least 1"));
        }

        let urls = [Some(&self.telegram.api_base), self.backend.endpoint.as_ref()];
        for url in urls.into_iter().flatten() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ResumerError::config(format!(
                    "URL must start with http:// or https://: {}",
                    url
                )));
            }
        }

        Ok(())
    }
}

/// Parse an optional value, falling back to `default` when unset
fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, ResumerError>
where
    G: Fn(&str) -> Option<String>,
    T: ParseValue,
{
    match get(key) {
        Some(raw) => T::parse_value(&raw)
            .ok_or_else(|| ResumerError::config(format!("Invalid value for {}: {}", key, raw))),
        None => Ok(default),
    }
}

trait ParseValue: Sized {
    fn parse_value(raw: &str) -> Option<Self>;
}

macro_rules! impl_parse_value {
    ($($t:ty),*) => {
        $(impl ParseValue for $t {
            fn parse_value(raw: &str) -> Option<Self> {
                raw.parse().ok()
            }
        })*
    };
}

impl_parse_value!(usize, u32, u64, f64);

impl<T: ParseValue> ParseValue for Option<T> {
    fn parse_value(raw: &str) -> Option<Self> {
        T::parse_value(raw).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("TELEGRAM_BOT_TOKEN", "123:ABC"),
        ("CHAT_ID", "42"),
        ("MODEL_API_KEY", "secret-key"),
    ];

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.backend.provider, Provider::Gemini);
        assert_eq!(config.backend.model, "gemini-1.5-flash");
        assert_eq!(config.backend.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.telegram.parse_mode.as_deref(), Some("Markdown"));
        assert_eq!(config.summary.chunk_size, 12_000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.log_level, "info");
        assert!(config.document_path.is_none());
    }

    #[test]
    fn test_missing_required_var_is_named() {
        for missing in ["TELEGRAM_BOT_TOKEN", "CHAT_ID", "MODEL_API_KEY"] {
            let pairs: Vec<_> = REQUIRED.iter().copied().filter(|(k, _)| *k != missing).collect();
            let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(err.to_string().contains(missing), "{err}");
        }
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("CHAT_ID", "   ");
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("CHAT_ID"));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("MODEL_PROVIDER", "Ollama"),
            ("CHUNK_SIZE", "3000"),
            ("CHUNK_OVERLAP", "200"),
            ("RETRY_BASE_DELAY_MS", "5"),
            ("TELEGRAM_PARSE_MODE", "none"),
        ]);
        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.backend.provider, Provider::Ollama);
        assert_eq!(config.backend.model, "llama3.2:latest");
        assert_eq!(config.summary.chunk_size, 3000);
        assert_eq!(config.summary.chunk_overlap, 200);
        assert_eq!(config.retry.base_delay, Duration::from_millis(5));
        assert!(config.telegram.parse_mode.is_none());
    }

    #[test]
    fn test_invalid_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MODEL_PROVIDER", "clippy"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("CHUNK_SIZE", "lots"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.extend([("CHUNK_SIZE", "100"), ("CHUNK_OVERLAP", "100")]);
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret-key"));
        assert!(!rendered.contains("123:ABC"));
        assert!(rendered.contains("<redacted>"));
    }
}
