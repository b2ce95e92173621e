//! Bounded retry policy for the retry-eligible stages.

use crate::models::StageName;
use crate::state::RetryCounters;

/// Retries allowed per stage per run (so five attempts in total).
pub const DEFAULT_MAX_RETRIES: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    /// Limits above `DEFAULT_MAX_RETRIES` are capped to it.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.min(DEFAULT_MAX_RETRIES),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Record one failed check for `stage` and decide whether it may run
    /// again. Returns the updated counters alongside the decision; stages
    /// without a retry path are always exhausted and leave counters as-is.
    pub fn check(&self, stage: StageName, counters: RetryCounters) -> (RetryCounters, RetryDecision) {
        if !stage.is_retryable() {
            return (counters, RetryDecision::Exhausted);
        }

        let counters = counters.incremented(stage);
        let used = counters.get(stage).unwrap_or(0);

        let decision = if used <= self.max_retries {
            RetryDecision::Retry
        } else {
            RetryDecision::Exhausted
        };

        (counters, decision)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}
