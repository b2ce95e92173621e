//! Environment-driven configuration
//!
//! Binaries call `dotenv::dotenv()` first, then `AgentConfig::from_env()`.

use crate::error::PipelineError;
use crate::pipeline::DEFAULT_MAX_RETRIES;
use crate::Result;
use std::env;

pub const DEFAULT_GROQ_MODEL: &str = "openai/gpt-oss-120b";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_PORT: u16 = 8080;

const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost",
    "http://localhost:5500",
    "https://yuan0404.github.io",
];

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub groq_api_key: String,
    pub groq_model: String,
    pub groq_base_url: String,
    pub financial_api_base_url: Option<String>,
    pub max_retries: u32,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub database_url: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            groq_api_key: String::new(),
            groq_model: DEFAULT_GROQ_MODEL.to_string(),
            groq_base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            financial_api_base_url: None,
            max_retries: DEFAULT_MAX_RETRIES,
            port: DEFAULT_PORT,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            database_url: None,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_retries = match non_empty("PIPELINE_MAX_RETRIES") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                PipelineError::Config(format!("PIPELINE_MAX_RETRIES={}: {}", raw, e))
            })?,
            None => defaults.max_retries,
        };
        if max_retries > DEFAULT_MAX_RETRIES {
            return Err(PipelineError::Config(format!(
                "PIPELINE_MAX_RETRIES={} exceeds the limit of {}",
                max_retries, DEFAULT_MAX_RETRIES
            )));
        }

        let port = match non_empty("PORT").or_else(|| non_empty("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| PipelineError::Config(format!("PORT={}: {}", raw, e)))?,
            None => defaults.port,
        };

        let allowed_origins = match non_empty("ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.allowed_origins,
        };

        Ok(Self {
            groq_api_key: non_empty("GROQ_API_KEY").unwrap_or_default(),
            groq_model: non_empty("GROQ_MODEL").unwrap_or(defaults.groq_model),
            groq_base_url: non_empty("GROQ_BASE_URL").unwrap_or(defaults.groq_base_url),
            financial_api_base_url: non_empty("FINANCIAL_API_BASE_URL"),
            max_retries,
            port,
            allowed_origins,
            database_url: non_empty("DATABASE_URL").or_else(|| non_empty("POSTGRES_URL")),
        })
    }
}
