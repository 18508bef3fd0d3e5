//! Resumer text extraction
//!
//! Turns a document on disk into normalized plain text

pub mod normalize;
pub mod source;

pub use normalize::normalize_text;
pub use source::{FileTextSource, TextSource, SUPPORTED_EXTENSIONS};
