pub mod config;
pub mod error;
pub mod logger;
pub mod retry;

// Re-export commonly used types
pub use config::{AppConfig, BackendConfig, Provider, SummaryPolicy, TelegramConfig};
pub use error::{
    BackendError, DispatchError, ErrorKind, ExtractionError, ResumerError, SummarizationError,
};
pub use retry::{retry, Attempted, RetryPolicy, Retryable};
pub type Result<T> = std::result::Result<T, ResumerError>;
