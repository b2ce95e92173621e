//! Error types for the financial statement agent

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {

    // =============================
    // Port Errors
    // =============================

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Financial data error: {0}")]
    DataProvider(String),

    // =============================
    // Pipeline Errors
    // =============================

    #[error("Missing state field: {0}")]
    MissingField(&'static str),

    #[error("History store error: {0}")]
    History(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
