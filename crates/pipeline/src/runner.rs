use resumer_common::{
    retry, AppConfig, BackendConfig, ResumerError, RetryPolicy, SummaryPolicy,
};
use resumer_extract::TextSource;
use resumer_llm::{split, SummarizationBackend, Summarizer};
use resumer_notify::Dispatcher;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::state::{PipelineState, RunReport};

/// A run that ended in `Failed`
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {error}")]
pub struct PipelineFailure {
    /// State the pipeline was in when the error surfaced
    pub stage: PipelineState,
    pub error: ResumerError,
    pub report: RunReport,
}

impl PipelineFailure {
    pub fn exit_code(&self) -> u8 {
        self.error.exit_code()
    }
}

/// Document → summary → chat message
pub struct Pipeline {
    source: Arc<dyn TextSource>,
    summarizer: Summarizer,
    dispatcher: Arc<dyn Dispatcher>,
    backend_config: BackendConfig,
    policy: SummaryPolicy,
    retry: RetryPolicy,
    recipient: String,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn TextSource>,
        backend: Arc<dyn SummarizationBackend>,
        dispatcher: Arc<dyn Dispatcher>,
        config: &AppConfig,
    ) -> Self {
        Self {
            source,
            summarizer: Summarizer::new(backend, config.summary.clone(), config.retry.clone()),
            dispatcher,
            backend_config: config.backend.clone(),
            policy: config.summary.clone(),
            retry: config.retry.clone(),
            recipient: config.telegram.chat_id.clone(),
        }
    }

    /// Run the whole pipeline once for `path`.
    ///
    /// Cancelling `cancel` drops in-flight work; nothing is dispatched after
    /// that point.
    pub async fn run(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<RunReport, PipelineFailure> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("run", run_id = %run_id);
        let mut report = RunReport::new(run_id, path);

        async move {
            info!("Processing document: {}", path.display());

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ResumerError::Cancelled),
                result = self.execute(path, &mut report) => result,
            };

            match result {
                Ok(()) => {
                    info!(
                        "Run complete - {} chunk(s), {} summary chars, {} dispatch attempt(s)",
                        report.chunk_count, report.summary_chars, report.dispatch_attempts
                    );
                    Ok(report)
                }
                Err(e) => {
                    let stage = report.state.clone();
                    let reason = match &e {
                        ResumerError::Cancelled => "cancelled".to_string(),
                        other => other.to_string(),
                    };
                    error!("Run failed during {}: {}", stage, reason);
                    report.transition(PipelineState::Failed(reason));

                    Err(PipelineFailure {
                        stage,
                        error: e,
                        report,
                    })
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, path: &Path, report: &mut RunReport) -> Result<(), ResumerError> {
        // Step 1: Extract text
        report.transition(PipelineState::Extracting);
        let text = self.source.extract(path).await?;
        if text.trim().is_empty() {
            return Err(ResumerError::NoContentExtracted);
        }
        report.extracted_chars = text.chars().count();

        // Step 2: Chunk
        report.transition(PipelineState::Chunking);
        let chunks = split(&text, self.policy.chunk_size, self.policy.chunk_overlap)?;
        if chunks.is_empty() {
            return Err(ResumerError::NoContentExtracted);
        }
        report.chunk_count = chunks.len();
        info!("Split {} chars into {} chunk(s)", report.extracted_chars, chunks.len());

        // Step 3: Summarize
        report.transition(PipelineState::Summarizing);
        let summary = self.summarizer.summarize(&chunks, &self.backend_config).await?;
        report.failed_chunks = summary.failed_chunks.clone();
        report.summary_chars = summary.text.chars().count();
        report.truncated = summary.truncated;

        // Step 4: Dispatch
        report.transition(PipelineState::Dispatching);
        let operation = format!("Dispatch via {}", self.dispatcher.channel_name());
        let attempted = retry(&self.retry, &operation, |_| {
            self.dispatcher.dispatch(&self.recipient, &summary.text)
        })
        .await?;
        report.dispatch_attempts = attempted.attempts;

        report.transition(PipelineState::Done);
        Ok(())
    }
}
