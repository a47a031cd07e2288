//! Storage trait definitions for SkillForge
//!
//! These traits define the storage abstractions consumed by the synthesis
//! pipeline:
//! - `SkillLibrary`: read-only lookup of Architect Specs, legacy descriptions
//!   and reference examples, owned by upstream authoring tools
//! - `ExperimentLog`: append-only experiment records, one per invocation
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;
use crate::schema::{ExperimentRecord, SkillEntry};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string) used to fingerprint generated code.
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Skill ids
// ---------------------------------------------------------------------------

/// Validate that a skill id can be used verbatim as a file stem.
///
/// Accepted: non-empty, ASCII alphanumerics plus `_`, `-`, `.`, and no `..`.
/// The mapping is the identity, so two distinct ids never share a path.
pub fn validate_skill_id(skill_id: &str) -> StorageResult<&str> {
    let ok = !skill_id.is_empty()
        && !skill_id.contains("..")
        && !skill_id.starts_with('.')
        && skill_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(skill_id)
    } else {
        Err(StorageError::InvalidSkillId(skill_id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// SkillLibrary
// ---------------------------------------------------------------------------

/// Read-only skill library.
///
/// Guarantees:
/// - `entry(id)` for an unknown id returns an empty [`SkillEntry`], never
///   an error; errors are reserved for unreadable or malformed backends.
/// - Reference examples are returned in their authored order.
#[async_trait]
pub trait SkillLibrary: Send + Sync {
    /// Fetch everything known about one skill.
    async fn entry(&self, skill_id: &str) -> StorageResult<SkillEntry>;

    /// List every skill id the library knows, sorted.
    async fn skill_ids(&self) -> StorageResult<Vec<String>>;
}

// ---------------------------------------------------------------------------
// ExperimentLog
// ---------------------------------------------------------------------------

/// Append-only experiment log.
///
/// Guarantees:
/// - `append` never rewrites or removes an earlier record.
/// - `entries` returns records oldest first: append order for file-backed
///   stores, `start_time` order for database-backed ones.
#[async_trait]
pub trait ExperimentLog: Send + Sync {
    /// Append one record.
    async fn append(&self, record: &ExperimentRecord) -> StorageResult<()>;

    /// All records, oldest first.
    async fn entries(&self) -> StorageResult<Vec<ExperimentRecord>>;

    /// Records for a single skill id, oldest first.
    async fn entries_for(&self, skill_id: &str) -> StorageResult<Vec<ExperimentRecord>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .filter(|r| r.skill_id == skill_id)
            .collect())
    }
}
