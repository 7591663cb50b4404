//! Prompt execution errors.

use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Prompt '{0}' not found")]
    UnknownPrompt(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Missing API key or other setup.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Prompt catalogue error: {0}")]
    Catalog(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Empty response from AI service")]
    EmptyResponse,

    #[error("Empty prompt")]
    EmptyPrompt,
}
