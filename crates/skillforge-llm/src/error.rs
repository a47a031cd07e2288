//! Error types for skillforge-llm

use thiserror::Error;

/// Errors raised while invoking a language model
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API key configured for a provider that requires one
    #[error("no API key configured for provider {0}")]
    MissingApiKey(String),

    /// Transport-level failure (DNS, TLS, connection reset, timeout)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status from the endpoint (auth, quota, server error)
    #[error("LLM endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("malformed completion response: {0}")]
    Decode(String),

    /// The endpoint answered without any completion text
    #[error("completion contained no text")]
    EmptyCompletion,

    /// Invalid client configuration
    #[error("invalid LLM configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Decode(err.to_string())
    }
}
