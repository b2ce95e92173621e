//! Workflow engine - drives one question through the fixed chain
//!
//! PARSE → EXTRACT → FETCH → CLEAN → ANSWER
//!
//! After every stage its validator runs and the router picks the next step:
//! advance, re-run the same stage, complete, or hand over to the stage's
//! failure handler. The engine owns the only mutable slot for the state.

use super::retry::RetryPolicy;
use super::router::{route, Route};
use crate::completion::CompletionPort;
use crate::market_data::FinancialDataPort;
use crate::models::{ConversationTurn, PipelineOutcome, RunStatus, StageName};
use crate::stages::{self, AnswerStage, CleanStage, ExtractStage, FetchStage, ParseStage, Stage};
use crate::state::PipelineState;
use crate::verification::{default_validator, Validator};
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A stage together with the check that follows it
#[derive(Clone)]
struct StageSlot {
    stage: Arc<dyn Stage>,
    validator: Arc<dyn Validator>,
}

pub struct WorkflowEngine {
    parse: StageSlot,
    extract: StageSlot,
    fetch: StageSlot,
    clean: StageSlot,
    answer: StageSlot,
    retry_policy: RetryPolicy,
}

impl WorkflowEngine {
    /// Standard chain: completion-backed stages and validators, fetch
    /// through the given data port.
    pub fn new(
        completion: Arc<dyn CompletionPort>,
        data: Arc<dyn FinancialDataPort>,
    ) -> Self {
        let slot = |stage: Arc<dyn Stage>| StageSlot {
            validator: default_validator(stage.name(), completion.clone()),
            stage,
        };

        Self {
            parse: slot(Arc::new(ParseStage::new(completion.clone()))),
            extract: slot(Arc::new(ExtractStage::new(completion.clone()))),
            fetch: slot(Arc::new(FetchStage::new(data))),
            clean: slot(Arc::new(CleanStage::new(completion.clone()))),
            answer: slot(Arc::new(AnswerStage::new(completion.clone()))),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Replace the stage registered under `stage.name()`.
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        let name = stage.name();
        self.slot_mut(name).stage = stage;
        self
    }

    pub fn with_validator(mut self, stage: StageName, validator: Arc<dyn Validator>) -> Self {
        self.slot_mut(stage).validator = validator;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    fn slot(&self, stage: StageName) -> &StageSlot {
        match stage {
            StageName::Parse => &self.parse,
            StageName::Extract => &self.extract,
            StageName::Fetch => &self.fetch,
            StageName::Clean => &self.clean,
            StageName::Answer => &self.answer,
        }
    }

    fn slot_mut(&mut self, stage: StageName) -> &mut StageSlot {
        match stage {
            StageName::Parse => &mut self.parse,
            StageName::Extract => &mut self.extract,
            StageName::Fetch => &mut self.fetch,
            StageName::Clean => &mut self.clean,
            StageName::Answer => &mut self.answer,
        }
    }

    /// Run one question to completion.
    ///
    /// Validation failures never surface as errors: every failure route ends
    /// with the stage's fixed message in `final_output`. An `Err` means a port
    /// call failed and the run was aborted.
    pub async fn run(
        &self,
        question: &str,
        history: Vec<ConversationTurn>,
        submitted_at: DateTime<Utc>,
    ) -> Result<PipelineOutcome> {
        let start_time = Instant::now();
        let run_id = Uuid::new_v4();
        let mut reasoning_trace = vec!["INPUT: Question received".to_string()];
        let mut stage_runs: u32 = 0;

        info!(
            run_id = %run_id,
            question = %question,
            history_turns = history.len(),
            "Pipeline: starting run"
        );

        let mut state = PipelineState::new(question, history, submitted_at);
        let mut current = StageName::Parse;

        let status = loop {
            let slot = self.slot(current);
            let attempt = state.retry_counters().get(current).unwrap_or(0) + 1;
            stage_runs += 1;

            debug!(run_id = %run_id, stage = %current, attempt, "Running stage");

            state = slot.stage.run(state).await.map_err(|e| {
                error!(run_id = %run_id, stage = %current, error = %e, "Stage aborted run");
                e
            })?;

            let validated = slot.validator.validate(&state).await.map_err(|e| {
                error!(run_id = %run_id, stage = %current, error = %e, "Validator aborted run");
                e
            })?;

            reasoning_trace.push(format!(
                "{}: attempt {} {}",
                current.as_str().to_uppercase(),
                attempt,
                if validated { "passed" } else { "rejected" }
            ));

            let (counters, next) =
                route(current, validated, state.retry_counters(), &self.retry_policy);
            state = state.with_retry_counters(counters);

            match next {
                Route::Advance(next_stage) => {
                    info!(run_id = %run_id, from = %current, to = %next_stage, "Stage passed");
                    current = next_stage;
                }
                Route::Retry => {
                    warn!(
                        run_id = %run_id,
                        stage = %current,
                        retries = counters.get(current).unwrap_or(0),
                        max_retries = self.retry_policy.max_retries(),
                        "Check failed - retrying stage"
                    );
                    reasoning_trace.push(format!(
                        "RETRY: {} ({}/{})",
                        current,
                        counters.get(current).unwrap_or(0),
                        self.retry_policy.max_retries()
                    ));
                }
                Route::Complete => {
                    reasoning_trace.push("COMPLETE: Answer accepted".to_string());
                    break RunStatus::Succeeded;
                }
                Route::Fail(failed) => {
                    warn!(run_id = %run_id, stage = %failed, "Check failed - routing to failure handler");
                    state = stages::fail(failed, state);
                    reasoning_trace.push(format!("FAIL: {} failure handler", failed));
                    break RunStatus::Failed { stage: failed };
                }
            }
        };

        let execution_time_ms = start_time.elapsed().as_millis() as u64;

        info!(
            run_id = %run_id,
            status = ?status,
            stage_runs,
            execution_time_ms,
            "Pipeline: run finished"
        );

        Ok(PipelineOutcome {
            run_id,
            status,
            user_input: state.user_input().to_string(),
            submitted_at: state.submitted_at(),
            parsed_question: state.parsed_question().map(str::to_string),
            extracted_fields: state.extracted_fields().map(str::to_string),
            fetched_data: state.fetched_data().map(str::to_string),
            cleaned_data: state.cleaned_data().map(str::to_string),
            final_output: state.final_output().unwrap_or_default().to_string(),
            retry_counters: state.retry_counters(),
            stage_runs,
            reasoning_trace,
            execution_time_ms,
        })
    }
}
