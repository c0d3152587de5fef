//! Step runner and the ratings pipeline built on it

use super::steps::{
    FetchContext, FetchStep, FormatContext, FormatStep, ItemResult, StoreContext, StoreStep,
};
use super::{PipelineError, PipelineState, Step};
use crate::history::HistoryStore;
use crate::lookup::{RatingLookup, RatingRecord};
use crate::observability::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, Instrument};

/// Runs steps one at a time and records every state the run passes through
#[derive(Debug)]
pub struct PipelineEngine {
    states: Vec<PipelineState>,
}

impl PipelineEngine {
    pub fn new() -> Self {
        Self {
            states: vec![PipelineState::Pending],
        }
    }

    pub fn state(&self) -> PipelineState {
        self.states
            .last()
            .copied()
            .unwrap_or(PipelineState::Pending)
    }

    pub fn states(&self) -> &[PipelineState] {
        &self.states
    }

    fn transition(&mut self, next: PipelineState) {
        info!(from = ?self.state(), to = ?next, "Pipeline state transition");
        self.states.push(next);
    }

    /// Execute one step; a step error moves the run to `Failed`
    pub async fn run_step<S: Step>(
        &mut self,
        step: &S,
        context: &S::Context,
    ) -> Result<S::Output, PipelineError> {
        if self.state().is_terminal() {
            return Err(PipelineError::AlreadyFinished(self.state()));
        }

        self.transition(S::STATE);
        let started = Instant::now();

        match step.execute(context).await {
            Ok(output) => {
                info!(
                    step = S::ID,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Step completed"
                );
                Ok(output)
            }
            Err(e) => {
                error!(step = S::ID, error = %e, "Step failed");
                self.transition(PipelineState::Failed);
                Err(PipelineError::StepFailed {
                    step: S::ID,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Mark the run as finished successfully
    pub fn complete(&mut self) -> Result<(), PipelineError> {
        if self.state().is_terminal() {
            return Err(PipelineError::AlreadyFinished(self.state()));
        }
        self.transition(PipelineState::Completed);
        Ok(())
    }
}

impl Default for PipelineEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Trigger payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInput {
    pub app_names: Vec<String>,
}

/// Final output of a completed run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRun {
    pub report: String,
    /// Records the store step actually appended to history
    pub ratings: Vec<RatingRecord>,
    /// Every successfully fetched record, stored or not
    pub fetched: Vec<RatingRecord>,
    /// One result per requested app, in request order
    pub items: Vec<ItemResult>,
    pub stored: usize,
    pub states: Vec<PipelineState>,
}

/// fetch-ratings → format-results → store-results
pub struct RatingPipeline {
    fetch: FetchStep,
    format: FormatStep,
    store: StoreStep,
}

impl RatingPipeline {
    pub fn new(lookup: Arc<dyn RatingLookup>, store: Option<Arc<dyn HistoryStore>>) -> Self {
        Self {
            fetch: FetchStep::new(lookup),
            format: FormatStep,
            store: StoreStep::new(store),
        }
    }

    pub async fn run(&self, input: PipelineInput) -> Result<PipelineRun, PipelineError> {
        let span = crate::pipeline_span!(input.app_names.len());
        async {
            metrics().pipeline_started();
            let result = self.execute(input).await;
            match &result {
                Ok(run) => {
                    metrics().pipeline_completed();
                    info!(
                        items = run.items.len(),
                        stored = run.stored,
                        "Pipeline completed"
                    );
                }
                Err(e) => {
                    metrics().pipeline_failed();
                    error!(error = %e, "Pipeline failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, input: PipelineInput) -> Result<PipelineRun, PipelineError> {
        let mut engine = PipelineEngine::new();

        let fetch_context = FetchContext {
            app_names: input.app_names,
        };
        let fetch = engine.run_step(&self.fetch, &fetch_context).await?;

        let format_context = FormatContext {
            app_names: fetch_context.app_names,
            fetch,
        };
        let format = engine.run_step(&self.format, &format_context).await?;

        let items = format_context.fetch.ratings;
        let store_context = StoreContext { format };
        let store = engine.run_step(&self.store, &store_context).await?;

        engine.complete()?;

        Ok(PipelineRun {
            report: store_context.format.report,
            ratings: store.records,
            fetched: store_context.format.ratings,
            items,
            stored: store.stored,
            states: engine.states().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StepError;
    use async_trait::async_trait;

    struct Doubling;

    #[async_trait]
    impl Step for Doubling {
        const ID: &'static str = "double";
        const STATE: PipelineState = PipelineState::Formatting;
        type Context = u32;
        type Output = u32;

        async fn execute(&self, context: &u32) -> Result<u32, StepError> {
            Ok(context * 2)
        }
    }

    struct Exploding;

    #[async_trait]
    impl Step for Exploding {
        const ID: &'static str = "explode";
        const STATE: PipelineState = PipelineState::Storing;
        type Context = ();
        type Output = ();

        async fn execute(&self, _context: &()) -> Result<(), StepError> {
            Err(StepError::new("disk on fire"))
        }
    }

    #[tokio::test]
    async fn test_engine_records_transitions() {
        let mut engine = PipelineEngine::new();
        assert_eq!(engine.run_step(&Doubling, &21).await.unwrap(), 42);
        engine.complete().unwrap();

        assert_eq!(
            engine.states(),
            &[
                PipelineState::Pending,
                PipelineState::Formatting,
                PipelineState::Completed
            ]
        );
    }

    #[tokio::test]
    async fn test_step_error_fails_run_and_blocks_later_steps() {
        let mut engine = PipelineEngine::new();

        let err = engine.run_step(&Exploding, &()).await.unwrap_err();
        match err {
            PipelineError::StepFailed { step, message } => {
                assert_eq!(step, "explode");
                assert_eq!(message, "disk on fire");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(engine.state(), PipelineState::Failed);

        let next = engine.run_step(&Doubling, &1).await;
        assert!(matches!(
            next,
            Err(PipelineError::AlreadyFinished(PipelineState::Failed))
        ));
        assert!(engine.complete().is_err());
    }
}
