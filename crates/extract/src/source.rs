use async_trait::async_trait;
use resumer_common::ExtractionError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::normalize::{decode_text, normalize_text};

/// File extensions the file source can read
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "xml", "txt"];

/// PDF files must carry this marker near the start
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Produces raw text from a document
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Reads documents from the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FileTextSource;

impl FileTextSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextSource for FileTextSource {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ExtractionError::FileNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(corrupted(path, e)),
        };

        if !metadata.is_file() {
            return Err(ExtractionError::UnsupportedFormat(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ExtractionError::UnsupportedFormat(format!(
                "'.{}' (supported: {})",
                extension,
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| corrupted(path, e))?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());

        let raw = match extension.as_str() {
            "pdf" => extract_pdf(path, bytes).await?,
            _ => decode_text(&bytes),
        };

        let text = normalize_text(&raw);
        if text.is_empty() {
            warn!("No text found in {}", path.display());
        } else {
            info!("Extracted {} characters from {}", text.chars().count(), path.display());
        }

        Ok(text)
    }
}

async fn extract_pdf(path: &Path, bytes: Vec<u8>) -> Result<String, ExtractionError> {
    let header = &bytes[..bytes.len().min(1024)];
    if !header.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        return Err(ExtractionError::Corrupted {
            path: path.to_path_buf(),
            reason: "missing PDF header".to_string(),
        });
    }

    // The PDF parser is CPU bound and may panic on malformed input
    let joined =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;

    match joined {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractionError::Corrupted {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
        Err(e) => Err(ExtractionError::Corrupted {
            path: path.to_path_buf(),
            reason: if e.is_panic() {
                "PDF parser crashed on this file".to_string()
            } else {
                e.to_string()
            },
        }),
    }
}

fn corrupted(path: &Path, err: std::io::Error) -> ExtractionError {
    ExtractionError::Corrupted {
        path: PathBuf::from(path),
        reason: err.to_string(),
    }
}
