use serde::{Deserialize, Serialize};

/// Ordered segment of the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the chunk sequence (0-based)
    pub index: usize,

    /// Chunk text
    pub content: String,

    /// Length of `content` in characters
    pub length: usize,
}

impl Chunk {
    pub fn new(index: usize, content: String) -> Self {
        let length = content.chars().count();
        Self {
            index,
            content,
            length,
        }
    }
}

/// Backend output for a single chunk
#[derive(Debug, Clone, PartialEq)]
pub struct PartialSummary {
    pub source_chunk_index: usize,
    pub text: String,

    /// Backend attempts it took, retries included
    pub attempts: u32,
}

/// Summary ready to be delivered
#[derive(Debug, Clone, Serialize)]
pub struct FinalSummary {
    /// Formatted summary text
    pub text: String,

    /// Number of chunks the document was split into
    pub chunk_count: usize,

    /// Indices of chunks left out after exhausting retries
    pub failed_chunks: Vec<usize>,

    /// Whether the text was cut to fit the target length
    pub truncated: bool,
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
pub struct OllamaRequest {
    /// Model name (e.g., "llama3.2", "gemma2")
    pub model: String,

    /// Prompt text
    pub prompt: String,

    /// System prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Disable streaming
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Generation options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// Generation options
#[derive(Debug, Clone, Serialize, Default)]
pub struct OllamaOptions {
    /// Temperature (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Top-p sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

/// Ollama generate response
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaResponse {
    /// Model name
    #[serde(default)]
    pub model: String,

    /// Generated text
    pub response: String,

    /// Whether generation is complete
    #[serde(default)]
    pub done: bool,
}
