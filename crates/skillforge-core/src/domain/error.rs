//! Domain-level error taxonomy for SkillForge synthesis.

use skillforge_llm::LlmError;
use skillforge_store::StorageError;

/// Errors that abort a synthesis attempt.
///
/// Repair passes never produce these; they report through
/// [`PassOutcome`](crate::repair::PassOutcome) instead.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("ablation tier must be 1, 2 or 3, got {0}")]
    InvalidAblation(u8),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("llm invocation failed: {0}")]
    Llm(#[from] LlmError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for synthesis operations.
pub type Result<T> = std::result::Result<T, SynthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_errors_keep_their_cause() {
        let err: SynthError = LlmError::Status {
            status: 503,
            body: "overloaded".to_string(),
        }
        .into();
        let msg = err.to_string();
        assert!(msg.starts_with("llm invocation failed"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn storage_errors_convert() {
        let err: SynthError = StorageError::InvalidSkillId("../x".to_string()).into();
        assert!(matches!(err, SynthError::Storage(_)));
        assert!(err.to_string().contains("../x"));
    }

    #[test]
    fn invalid_ablation_names_the_value() {
        assert!(SynthError::InvalidAblation(7).to_string().contains('7'));
    }
}
