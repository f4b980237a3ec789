//! Error types for agenda-core

use thiserror::Error;

/// Main error type for agenda-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Assistant API error: {0}")]
    AssistantApi(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Unknown function name {0}")]
    UnknownFunction(String),

    #[error("Tool schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Run {run_id} still pending after {attempts} polls")]
    PollTimeout { run_id: String, attempts: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for agenda-core
pub type Result<T> = std::result::Result<T, Error>;
