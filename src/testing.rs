//! Deterministic port and validator doubles shared by the unit tests.

use crate::completion::CompletionPort;
use crate::error::PipelineError;
use crate::market_data::{FinancialDataPort, InMemoryFinancialData};
use crate::models::{FinancialSnapshot, PeriodType, StageName, StatementKind};
use crate::stages::Stage;
use crate::state::PipelineState;
use crate::verification::Validator;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Replies with a fixed script, in order, and records every prompt.
/// Running past the end of the script is a completion error.
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionPort for ScriptedCompletion {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PipelineError::Completion("script exhausted".to_string()))
    }
}

pub type FetchCall = (String, NaiveDate, StatementKind, PeriodType);

/// In-memory data port that records every lookup.
#[derive(Default)]
pub struct RecordingFinancialData {
    inner: InMemoryFinancialData,
    calls: Mutex<Vec<FetchCall>>,
    fail: bool,
}

impl RecordingFinancialData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_snapshot(
        mut self,
        kind: StatementKind,
        period_type: PeriodType,
        snapshot: FinancialSnapshot,
    ) -> Self {
        self.inner.insert(kind, period_type, snapshot);
        self
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FinancialDataPort for RecordingFinancialData {
    async fn fetch(
        &self,
        ticker: &str,
        as_of: NaiveDate,
        kind: StatementKind,
        period_type: PeriodType,
    ) -> Result<Option<FinancialSnapshot>> {
        self.calls
            .lock()
            .unwrap()
            .push((ticker.to_string(), as_of, kind, period_type));

        if self.fail {
            return Err(PipelineError::DataProvider("provider unavailable".to_string()));
        }

        self.inner.fetch(ticker, as_of, kind, period_type).await
    }
}

/// Returns scripted verdicts in order, repeating the last one once the
/// script runs out.
pub struct ScriptedValidator {
    verdicts: Mutex<VecDeque<bool>>,
    last: Mutex<bool>,
    calls: AtomicUsize,
}

impl ScriptedValidator {
    pub fn new<I: IntoIterator<Item = bool>>(verdicts: I) -> Self {
        Self {
            verdicts: Mutex::new(verdicts.into_iter().collect()),
            last: Mutex::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(verdict: bool) -> Self {
        Self::new([verdict])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Validator for ScriptedValidator {
    async fn validate(&self, _state: &PipelineState) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.verdicts.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(*last)
    }
}

/// Wraps a stage and counts its executions.
pub struct CountingStage {
    inner: Arc<dyn Stage>,
    runs: AtomicUsize,
}

impl CountingStage {
    pub fn new(inner: Arc<dyn Stage>) -> Self {
        Self {
            inner,
            runs: AtomicUsize::new(0),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Stage for CountingStage {
    fn name(&self) -> StageName {
        self.inner.name()
    }

    async fn run(&self, state: PipelineState) -> Result<PipelineState> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.inner.run(state).await
    }
}
