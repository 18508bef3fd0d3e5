//! Resumer LLM Integration
//!
//! Text chunking, pluggable generation backends and map-reduce summarization

mod backend;
mod chunking;
mod format;
mod gemini;
mod ollama;
mod prompts;
mod summarize;
mod types;

#[cfg(test)]
mod test_support;

pub use backend::{create_backend, SummarizationBackend};
pub use chunking::{split, split_paragraphs};
pub use format::{normalize_for_chat, truncate_at_sentence, TRUNCATION_MARKER};
pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;
pub use summarize::{MapOutcome, Summarizer};
pub use types::{Chunk, FinalSummary, PartialSummary};
