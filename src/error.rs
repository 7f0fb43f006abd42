//! Error taxonomy
//!
//! One enum per failure domain. Each operation fails terminally; nothing here
//! is retried automatically.

use thiserror::Error;

/// Configuration problems. Fatal for the operation that hit them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    MissingCredential(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Reasons a document could not be loaded.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported file type '{0}', only application/pdf is accepted")]
    UnsupportedType(String),

    #[error("could not read PDF: {0}")]
    Unreadable(String),

    #[error("document contains no extractable text")]
    NoText,
}

/// Transport or API-level failure talking to the model endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("stream error: {0}")]
    Stream(String),
}

/// Generic wrapper surfaced to the session when answer streaming fails.
#[derive(Debug, Error)]
#[error("failed to get response from the model")]
pub struct GenerationError {
    #[source]
    pub source: LlmError,
}

impl From<LlmError> for GenerationError {
    fn from(source: LlmError) -> Self {
        Self { source }
    }
}
