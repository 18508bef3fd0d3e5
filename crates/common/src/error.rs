use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Whether a failed operation is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Retry may succeed (timeout, rate limit, flaky network)
    Transient,
    /// Retry will not help (bad credential, rejected content)
    Permanent,
}

impl ErrorKind {
    /// Classify an HTTP status code returned by a remote API
    pub fn from_status(status: u16) -> Self {
        match status {
            408 | 425 | 429 | 500..=599 => Self::Transient,
            _ => Self::Permanent,
        }
    }

    pub fn is_transient(self) -> bool {
        self == Self::Transient
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// Source document could not be turned into text
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("corrupted document {}: {reason}", path.display())]
    Corrupted { path: PathBuf, reason: String },
}

/// Text-generation backend call failed
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} backend error: {message}")]
pub struct BackendError {
    pub kind: ErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn transient<S: Into<String>>(msg: S) -> Self {
        Self {
            kind: ErrorKind::Transient,
            message: msg.into(),
        }
    }

    pub fn permanent<S: Into<String>>(msg: S) -> Self {
        Self {
            kind: ErrorKind::Permanent,
            message: msg.into(),
        }
    }

    /// Build from a non-success HTTP response
    pub fn from_status(status: u16, body: &str) -> Self {
        Self {
            kind: ErrorKind::from_status(status),
            message: format!("HTTP {}: {}", status, body.trim()),
        }
    }
}

/// Summarizer could not produce a final summary
#[derive(Debug, thiserror::Error)]
pub enum SummarizationError {
    #[error("no chunks to summarize")]
    NoChunks,

    #[error("insufficient coverage: {failed} of {total} chunks failed")]
    InsufficientCoverage { failed: usize, total: usize },

    #[error("reduction pass failed: {0}")]
    ReductionFailed(BackendError),

    #[error(transparent)]
    Backend(BackendError),
}

/// Message delivery failed
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} dispatch error: {message}")]
pub struct DispatchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DispatchError {
    pub fn transient<S: Into<String>>(msg: S) -> Self {
        Self {
            kind: ErrorKind::Transient,
            message: msg.into(),
        }
    }

    pub fn permanent<S: Into<String>>(msg: S) -> Self {
        Self {
            kind: ErrorKind::Permanent,
            message: msg.into(),
        }
    }
}

/// Resumer error types
#[derive(Debug, thiserror::Error)]
pub enum ResumerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Document yielded no text worth summarizing
    #[error("No content extracted from document")]
    NoContentExtracted,

    #[error("Summarization error: {0}")]
    Summarization(#[from] SummarizationError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Run was cancelled before completion
    #[error("Cancelled")]
    Cancelled,

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ResumerError {
    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::InvalidInput(_) => 2,
            Self::Extraction(_) | Self::NoContentExtracted => 3,
            Self::Summarization(_) => 4,
            Self::Dispatch(_) => 5,
            Self::Cancelled => 130,
            Self::Other(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(ErrorKind::from_status(429), ErrorKind::Transient);
        assert_eq!(ErrorKind::from_status(408), ErrorKind::Transient);
        assert_eq!(ErrorKind::from_status(503), ErrorKind::Transient);
        assert_eq!(ErrorKind::from_status(400), ErrorKind::Permanent);
        assert_eq!(ErrorKind::from_status(401), ErrorKind::Permanent);
        assert_eq!(ErrorKind::from_status(403), ErrorKind::Permanent);
    }

    #[test]
    fn test_backend_error_from_status() {
        let err = BackendError::from_status(500, " upstream exploded \n");
        assert!(err.kind.is_transient());
        assert_eq!(err.message, "HTTP 500: upstream exploded");
        assert_eq!(err.to_string(), "transient backend error: HTTP 500: upstream exploded");
    }

    #[test]
    fn test_exit_codes_are_non_zero() {
        let errors = vec![
            ResumerError::config("missing"),
            ResumerError::Extraction(ExtractionError::FileNotFound(PathBuf::from("a.pdf"))),
            ResumerError::NoContentExtracted,
            ResumerError::Summarization(SummarizationError::NoChunks),
            ResumerError::Dispatch(DispatchError::permanent("chat not found")),
            ResumerError::Cancelled,
        ];
        for err in errors {
            assert_ne!(err.exit_code(), 0, "{err}");
        }
    }

    #[test]
    fn test_backend_failures_exit_as_summarization() {
        let err: ResumerError =
            SummarizationError::Backend(BackendError::permanent("HTTP 401: bad key")).into();
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("HTTP 401: bad key"));

        let other: ResumerError = anyhow::anyhow!("client setup failed").into();
        assert_eq!(other.exit_code(), 1);
    }
}
