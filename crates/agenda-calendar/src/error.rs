//! Error types for agenda-calendar

use thiserror::Error;

/// agenda-calendar error type
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Calendar API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Credential store error: {0}")]
    Store(String),
}

impl CalendarError {
    /// Detail shown to the assistant; the raw response body for API errors
    pub fn detail(&self) -> String {
        match self {
            Self::Api { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

impl From<agenda_core::Error> for CalendarError {
    fn from(e: agenda_core::Error) -> Self {
        Self::Store(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CalendarError>;
