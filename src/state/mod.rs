//! Pipeline state threaded through the stages
//!
//! The state is a value: every stage takes it by value and hands back a new
//! one with its own output field replaced. Inputs are fixed at construction
//! and have no setters.

use crate::models::{ConversationTurn, StageName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Retry counters for the retry-eligible stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryCounters {
    pub extract: u32,
    pub clean: u32,
    pub answer: u32,
}

impl RetryCounters {
    /// Counter for `stage`, or `None` when the stage has no retry path.
    pub fn get(&self, stage: StageName) -> Option<u32> {
        match stage {
            StageName::Extract => Some(self.extract),
            StageName::Clean => Some(self.clean),
            StageName::Answer => Some(self.answer),
            StageName::Parse | StageName::Fetch => None,
        }
    }

    /// Copy with `stage`'s counter bumped by one. Non-retryable stages are
    /// left untouched.
    pub fn incremented(self, stage: StageName) -> Self {
        let mut next = self;
        match stage {
            StageName::Extract => next.extract += 1,
            StageName::Clean => next.clean += 1,
            StageName::Answer => next.answer += 1,
            StageName::Parse | StageName::Fetch => {}
        }
        next
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    user_input: String,
    conversation_history: Vec<ConversationTurn>,
    submitted_at: DateTime<Utc>,

    parsed_question: Option<String>,
    extracted_fields: Option<String>,
    fetched_data: Option<String>,
    cleaned_data: Option<String>,
    final_output: Option<String>,

    retry_counters: RetryCounters,
}

impl PipelineState {
    pub fn new(
        user_input: impl Into<String>,
        conversation_history: Vec<ConversationTurn>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_input: user_input.into(),
            conversation_history,
            submitted_at,
            parsed_question: None,
            extracted_fields: None,
            fetched_data: None,
            cleaned_data: None,
            final_output: None,
            retry_counters: RetryCounters::default(),
        }
    }

    // =============================
    // Readers
    // =============================

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn conversation_history(&self) -> &[ConversationTurn] {
        &self.conversation_history
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn parsed_question(&self) -> Option<&str> {
        self.parsed_question.as_deref()
    }

    pub fn extracted_fields(&self) -> Option<&str> {
        self.extracted_fields.as_deref()
    }

    pub fn fetched_data(&self) -> Option<&str> {
        self.fetched_data.as_deref()
    }

    pub fn cleaned_data(&self) -> Option<&str> {
        self.cleaned_data.as_deref()
    }

    pub fn final_output(&self) -> Option<&str> {
        self.final_output.as_deref()
    }

    pub fn retry_counters(&self) -> RetryCounters {
        self.retry_counters
    }

    // =============================
    // Writers (value in, value out)
    // =============================

    pub fn with_parsed_question(self, parsed_question: String) -> Self {
        Self {
            parsed_question: Some(parsed_question),
            ..self
        }
    }

    pub fn with_extracted_fields(self, extracted_fields: String) -> Self {
        Self {
            extracted_fields: Some(extracted_fields),
            ..self
        }
    }

    pub fn with_fetched_data(self, fetched_data: String) -> Self {
        Self {
            fetched_data: Some(fetched_data),
            ..self
        }
    }

    pub fn with_cleaned_data(self, cleaned_data: String) -> Self {
        Self {
            cleaned_data: Some(cleaned_data),
            ..self
        }
    }

    pub fn with_final_output(self, final_output: String) -> Self {
        Self {
            final_output: Some(final_output),
            ..self
        }
    }

    pub(crate) fn with_retry_counters(self, retry_counters: RetryCounters) -> Self {
        Self {
            retry_counters,
            ..self
        }
    }

    /// Render the conversation history the way prompts expect it.
    pub fn formatted_history(&self) -> String {
        if self.conversation_history.is_empty() {
            return "(none)".to_string();
        }

        self.conversation_history
            .iter()
            .map(|turn| format!("User: {}\nAssistant: {}", turn.user, turn.assistant))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> PipelineState {
        PipelineState::new("台積電 2024Q1 營收?", vec![], Utc::now())
    }

    #[test]
    fn test_new_state_is_blank() {
        let state = state();
        assert_eq!(state.user_input(), "台積電 2024Q1 營收?");
        assert!(state.parsed_question().is_none());
        assert!(state.final_output().is_none());
        assert_eq!(state.retry_counters(), RetryCounters::default());
    }

    #[test]
    fn test_writer_replaces_only_its_field() {
        let state = state()
            .with_parsed_question("first".to_string())
            .with_extracted_fields("fields".to_string())
            .with_parsed_question("second".to_string());

        assert_eq!(state.parsed_question(), Some("second"));
        assert_eq!(state.extracted_fields(), Some("fields"));
        assert!(state.fetched_data().is_none());
    }

    #[test]
    fn test_counters_ignore_non_retryable_stages() {
        let counters = RetryCounters::default()
            .incremented(StageName::Extract)
            .incremented(StageName::Extract)
            .incremented(StageName::Parse)
            .incremented(StageName::Fetch)
            .incremented(StageName::Answer);

        assert_eq!(counters.get(StageName::Extract), Some(2));
        assert_eq!(counters.get(StageName::Clean), Some(0));
        assert_eq!(counters.get(StageName::Answer), Some(1));
        assert_eq!(counters.get(StageName::Parse), None);
        assert_eq!(counters.get(StageName::Fetch), None);
    }

    #[test]
    fn test_formatted_history() {
        let state = PipelineState::new(
            "q",
            vec![
                ConversationTurn::new("a", "b"),
                ConversationTurn::new("c", "d"),
            ],
            Utc::now(),
        );
        assert_eq!(
            state.formatted_history(),
            "User: a\nAssistant: b\n\nUser: c\nAssistant: d"
        );
        assert_eq!(
            PipelineState::new("q", vec![], Utc::now()).formatted_history(),
            "(none)"
        );
    }
}
