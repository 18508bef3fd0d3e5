use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Pipeline run states
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Extracting,
    Chunking,
    Summarizing,
    Dispatching,
    Done,
    Failed(String),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Extracting => "extracting",
            Self::Chunking => "chunking",
            Self::Summarizing => "summarizing",
            Self::Dispatching => "dispatching",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed ({})", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

/// What happened during one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub document: PathBuf,
    pub state: PipelineState,

    /// Every state entered, in order
    pub history: Vec<PipelineState>,

    pub extracted_chars: usize,
    pub chunk_count: usize,
    pub failed_chunks: Vec<usize>,
    pub summary_chars: usize,
    pub truncated: bool,
    pub dispatch_attempts: u32,
}

impl RunReport {
    pub fn new(run_id: impl Into<String>, document: &Path) -> Self {
        Self {
            run_id: run_id.into(),
            document: document.to_path_buf(),
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
            extracted_chars: 0,
            chunk_count: 0,
            failed_chunks: Vec::new(),
            summary_chars: 0,
            truncated: false,
            dispatch_attempts: 0,
        }
    }

    /// Move to `next`. Terminal states are never left.
    pub fn transition(&mut self, next: PipelineState) {
        if self.state.is_terminal() {
            return;
        }

        info!("Pipeline state: {} -> {}", self.state, next);
        self.history.push(next.clone());
        self.state = next;
    }
}
