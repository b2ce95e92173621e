//! Routing decision after each stage execution.
//!
//! | Stage   | check passes | fails, retries left | fails, exhausted |
//! |---------|--------------|---------------------|------------------|
//! | parse   | extract      | -                   | parse failure    |
//! | extract | fetch        | extract             | extract failure  |
//! | fetch   | clean        | -                   | fetch failure    |
//! | clean   | answer       | clean               | clean failure    |
//! | answer  | complete     | answer              | answer failure   |

use super::retry::{RetryDecision, RetryPolicy};
use crate::models::StageName;
use crate::state::RetryCounters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Advance(StageName),
    Retry,
    Complete,
    Fail(StageName),
}

/// Pure routing function. Counters change only when a retry-eligible stage
/// failed its check.
pub fn route(
    stage: StageName,
    validated: bool,
    counters: RetryCounters,
    policy: &RetryPolicy,
) -> (RetryCounters, Route) {
    if validated {
        let next = match stage.next() {
            Some(next) => Route::Advance(next),
            None => Route::Complete,
        };
        return (counters, next);
    }

    if !stage.is_retryable() {
        return (counters, Route::Fail(stage));
    }

    match policy.check(stage, counters) {
        (counters, RetryDecision::Retry) => (counters, Route::Retry),
        (counters, RetryDecision::Exhausted) => (counters, Route::Fail(stage)),
    }
}
