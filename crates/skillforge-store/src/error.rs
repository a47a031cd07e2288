//! Error types for skillforge-store

use thiserror::Error;

/// Errors raised by skill library and experiment log backends
#[derive(Error, Debug)]
pub enum StorageError {
    /// Skill identifier cannot be mapped to a storage key
    #[error("invalid skill id: {0:?}")]
    InvalidSkillId(String),

    /// A library entry exists but could not be decoded
    #[error("malformed library entry {skill_id}: {reason}")]
    MalformedEntry { skill_id: String, reason: String },

    /// A stored digest string is not valid SHA-256 hex
    #[error("invalid digest: {digest}")]
    InvalidDigest { digest: String },

    /// Database connection error
    #[error("database connection failed: {0}")]
    Connection(String),

    /// Backend query or write failure
    #[error("backend error: {0}")]
    Backend(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}
