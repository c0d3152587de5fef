//! Scheduled ratings pipeline
//!
//! A strictly ordered fetch → format → store sequence. Each step reads a typed
//! context holding the outputs of every earlier step; [`PipelineEngine`] runs
//! steps and tracks the run's state, and [`RatingPipeline`] wires the three
//! rating steps together.

pub mod engine;
pub mod steps;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use engine::{PipelineEngine, PipelineInput, PipelineRun, RatingPipeline};
pub use steps::{
    format_report, group_thousands, FetchContext, FetchOutput, FetchStep, FormatContext,
    FormatOutput, FormatStep, ItemResult, StoreContext, StoreOutput, StoreStep,
};

/// Lifecycle of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Pending,
    Fetching,
    Formatting,
    Storing,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }
}

/// Failure raised by a step as a whole; per-item failures never surface here
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StepError {
    pub message: String,
}

impl StepError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: &'static str, message: String },

    #[error("Pipeline already finished in state {0:?}")]
    AlreadyFinished(PipelineState),
}

/// One named unit of pipeline work
#[async_trait]
pub trait Step: Send + Sync {
    /// Stable identifier used in logs and errors
    const ID: &'static str;
    /// State the run is in while this step executes
    const STATE: PipelineState;

    /// Typed view of the run so far
    type Context: Send + Sync;
    type Output: Send;

    async fn execute(&self, context: &Self::Context) -> Result<Self::Output, StepError>;
}
