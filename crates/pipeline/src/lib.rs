pub mod runner;
pub mod state;

pub use runner::{Pipeline, PipelineFailure};
pub use state::{PipelineState, RunReport};
