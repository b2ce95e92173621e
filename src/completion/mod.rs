//! Completion port
//!
//! Every stage that needs natural-language work goes through this trait.
//! The live implementation talks to Groq; tests script the replies.

use crate::Result;
use async_trait::async_trait;

pub mod groq;
pub use groq::GroqClient;

/// Text generation service (prompt in, generated text out)
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
