use clap::Parser;
use resumer_common::{logger, AppConfig, ResumerError};
use resumer_extract::FileTextSource;
use resumer_llm::create_backend;
use resumer_notify::TelegramDispatcher;
use resumer_pipeline::Pipeline;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    }
}

#[derive(Parser)]
#[command(name = "resumer")]
#[command(about = "Summarize a document and send the summary to a Telegram chat", long_about = None)]
struct Cli {
    /// Document to summarize (.pdf, .xml or .txt); defaults to DOCUMENT_PATH
    document: Option<PathBuf>,

    /// Log level (overrides LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,
}

fn setup(cli: Cli) -> Result<(Pipeline, PathBuf), ResumerError> {
    // AppConfig::from_env() falls back to .env in the working directory
    let mut config = AppConfig::from_env()?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    logger::init_logging(&config.log_level, config.log_dir.as_deref())?;

    let document = cli
        .document
        .or_else(|| config.document_path.clone())
        .ok_or_else(|| {
            ResumerError::invalid_input("no document given (pass a path or set DOCUMENT_PATH)")
        })?;

    tracing::info!("Resumer starting...");
    tracing::info!("Configuration loaded:");
    tracing::info!("  Provider: {} ({})", config.backend.provider, config.backend.model);
    tracing::info!(
        "  Chunk size: {} (overlap {})",
        config.summary.chunk_size,
        config.summary.chunk_overlap
    );
    tracing::info!("  Max concurrency: {}", config.summary.max_concurrency);

    let backend = create_backend(&config.backend)?;
    let dispatcher = Arc::new(TelegramDispatcher::new(&config.telegram)?);
    let pipeline = Pipeline::new(Arc::new(FileTextSource::new()), backend, dispatcher, &config);

    Ok((pipeline, document))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Project-root .env first so it wins over the working directory one
    load_dotenv_from_project_root();

    let (pipeline, document) = match setup(cli) {
        Ok(ready) => ready,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    match pipeline.run(&document, &cancel).await {
        Ok(report) => {
            tracing::info!("Summary of {} delivered", report.document.display());
            ExitCode::SUCCESS
        }
        Err(failure) => {
            eprintln!("Error: {}", failure);
            ExitCode::from(failure.exit_code())
        }
    }
}
