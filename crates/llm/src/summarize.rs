use futures::{stream, StreamExt, TryStreamExt};
use resumer_common::{
    retry, Attempted, BackendConfig, BackendError, RetryPolicy, SummarizationError, SummaryPolicy,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::SummarizationBackend;
use crate::format::{normalize_for_chat, truncate_at_sentence};
use crate::prompts::{chunk_instructions, join_section_summaries, with_task, REDUCE_INSTRUCTIONS};
use crate::types::{Chunk, FinalSummary, PartialSummary};

/// Result of the map phase
#[derive(Debug, Clone, Default)]
pub struct MapOutcome {
    /// Successful partial summaries, in chunk order
    pub partials: Vec<PartialSummary>,

    /// Indices of chunks whose retries ran out
    pub failed: Vec<usize>,
}

enum ChunkOutcome {
    Done(PartialSummary),
    Failed(usize),
}

/// Summarizer for long text using map-reduce strategy
pub struct Summarizer {
    backend: Arc<dyn SummarizationBackend>,
    policy: SummaryPolicy,
    retry: RetryPolicy,
}

impl Summarizer {
    /// Create new summarizer
    pub fn new(
        backend: Arc<dyn SummarizationBackend>,
        policy: SummaryPolicy,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            policy,
            retry,
        }
    }

    /// Summarize ordered chunks into one chat-ready summary
    pub async fn summarize(
        &self,
        chunks: &[Chunk],
        config: &BackendConfig,
    ) -> Result<FinalSummary, SummarizationError> {
        if chunks.is_empty() {
            return Err(SummarizationError::NoChunks);
        }

        info!(
            "Starting summarization - {} chunk(s), backend: {}",
            chunks.len(),
            self.backend.name()
        );

        // Step 1: Summarize each chunk (map phase)
        let outcome = self.map_chunks(chunks, config).await?;

        // Step 2: Combine chunk summaries (reduce phase)
        let raw = if chunks.len() == 1 {
            outcome.partials[0].text.clone()
        } else {
            self.reduce(&outcome.partials, config).await?
        };

        // Step 3: Format for chat and enforce the length limit
        let normalized = normalize_for_chat(&raw);
        if normalized.is_empty() {
            return Err(SummarizationError::ReductionFailed(BackendError::permanent(
                "summary is empty after formatting",
            )));
        }

        let (text, truncated) = truncate_at_sentence(&normalized, self.policy.target_length);
        if truncated {
            info!(
                "Summary truncated from {} to {} chars",
                normalized.chars().count(),
                text.chars().count()
            );
        }

        Ok(FinalSummary {
            text,
            chunk_count: chunks.len(),
            failed_chunks: outcome.failed,
            truncated,
        })
    }

    /// Summarize every chunk, up to `max_concurrency` at a time.
    ///
    /// Chunks that exhaust their retries are left out; too many of them
    /// fails the whole operation. A permanent backend error aborts
    /// immediately.
    pub async fn map_chunks(
        &self,
        chunks: &[Chunk],
        config: &BackendConfig,
    ) -> Result<MapOutcome, SummarizationError> {
        let total = chunks.len();

        let calls = chunks.iter().map(|chunk| self.summarize_chunk(chunk, total, config));
        let outcomes: Vec<ChunkOutcome> = stream::iter(calls)
            .buffered(self.policy.max_concurrency.max(1))
            .try_collect()
            .await
            .map_err(SummarizationError::Backend)?;

        let mut result = MapOutcome::default();
        for outcome in outcomes {
            match outcome {
                ChunkOutcome::Done(partial) => result.partials.push(partial),
                ChunkOutcome::Failed(index) => result.failed.push(index),
            }
        }

        if !result.failed.is_empty() {
            warn!(
                "Omitting {} of {} chunk(s) from the summary: {:?}",
                result.failed.len(),
                total,
                result.failed
            );
        }

        let failed_ratio = result.failed.len() as f64 / total as f64;
        if result.partials.is_empty() || failed_ratio > self.policy.max_failed_ratio {
            return Err(SummarizationError::InsufficientCoverage {
                failed: result.failed.len(),
                total,
            });
        }

        Ok(result)
    }

    /// Summarize a single chunk
    async fn summarize_chunk(
        &self,
        chunk: &Chunk,
        total: usize,
        config: &BackendConfig,
    ) -> Result<ChunkOutcome, BackendError> {
        let instructions = chunk_instructions(chunk.index, total);
        let system_prompt = with_task(&config.system_prompt, &instructions);
        let operation = format!("Chunk {}/{}", chunk.index + 1, total);

        debug!("Summarizing chunk {}/{} ({} chars)", chunk.index + 1, total, chunk.length);

        let attempted = retry(&self.retry, &operation, |_| {
            self.backend
                .generate(&system_prompt, &chunk.content, self.policy.map_max_tokens)
        })
        .await;

        match attempted {
            Ok(Attempted { value, attempts }) => Ok(ChunkOutcome::Done(PartialSummary {
                source_chunk_index: chunk.index,
                text: value,
                attempts,
            })),
            Err(e) if e.kind.is_transient() => Ok(ChunkOutcome::Failed(chunk.index)),
            Err(e) => Err(e),
        }
    }

    /// Condense partial summaries with one more backend call
    async fn reduce(
        &self,
        partials: &[PartialSummary],
        config: &BackendConfig,
    ) -> Result<String, SummarizationError> {
        let sections = partials.iter().map(|p| (p.source_chunk_index, p.text.as_str()));
        let combined = join_section_summaries(sections);
        let system_prompt = with_task(&config.system_prompt, REDUCE_INSTRUCTIONS);

        info!("Combined chunk summaries - Length: {} chars", combined.chars().count());

        retry(&self.retry, "Reduce pass", |_| {
            self.backend
                .generate(&system_prompt, &combined, self.policy.reduce_max_tokens)
        })
        .await
        .map(|attempted| attempted.value)
        .map_err(SummarizationError::ReductionFailed)
    }
}
