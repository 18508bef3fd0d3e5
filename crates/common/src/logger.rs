use crate::error::ResumerError;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Name of the log file written under `LOG_DIR`
pub const LOG_FILE_NAME: &str = "resumer.log";

/// Install the global subscriber.
///
/// Diagnostics go to stderr; with `log_dir` set they are also appended to
/// `resumer.log` there, together with run span timings. Returns the log
/// file path when one is used.
pub fn init_logging(
    log_level: &str,
    log_dir: Option<&Path>,
) -> Result<Option<PathBuf>, ResumerError> {
    let filter = build_filter(std::env::var("RUST_LOG").ok(), log_level)?;

    let file = log_dir.map(open_log_file).transpose()?;
    let file_path = file.as_ref().map(|(_, path)| path.clone());

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true);

    let file_layer = file.map(|(handle, _)| {
        fmt::layer()
            .with_writer(handle)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ResumerError::config(format!("Failed to initialize logging: {}", e)))?;

    match &file_path {
        Some(path) => {
            tracing::debug!("Logging to stderr and {} (level={})", path.display(), log_level)
        }
        None => tracing::debug!("Logging to stderr only (level={})", log_level),
    }

    Ok(file_path)
}

/// `RUST_LOG` wins over the configured level when it is set and non-blank
fn build_filter(rust_log: Option<String>, log_level: &str) -> Result<EnvFilter, ResumerError> {
    let directives = rust_log
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| log_level.to_string());

    EnvFilter::try_new(&directives)
        .map_err(|e| ResumerError::config(format!("Invalid log filter '{}': {}", directives, e)))
}

fn open_log_file(log_dir: &Path) -> Result<(File, PathBuf), ResumerError> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        ResumerError::config(format!("Failed to create log directory {}: {}", log_dir.display(), e))
    })?;

    let path = log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            ResumerError::config(format!("Failed to open log file {}: {}", path.display(), e))
        })?;

    Ok((file, path))
}
