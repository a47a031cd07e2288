//! The ephemeral state of one synthesis invocation.
//!
//! A `GenerationAttempt` is filled in stage by stage and converted into an
//! [`ExperimentRecord`] exactly once, whichever way the attempt ended.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillforge_llm::TokenUsage;
use skillforge_store::{ContentDigest, ExperimentRecord, LLM_FAILURE_SENTINEL, NO_ERROR};

use super::options::SynthesisOptions;

/// Running fix counters. Only ever incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixCounters {
    pub regex_fixes: u32,
    pub ast_repairs: u32,
    pub logic_fixes: u32,
}

impl FixCounters {
    pub fn total(&self) -> u32 {
        self.regex_fixes + self.ast_repairs + self.logic_fixes
    }

    /// Whether any repair occurred.
    pub fn any(&self) -> bool {
        self.total() > 0
    }
}

/// Everything captured so far for one invocation.
#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    pub skill_id: String,
    pub started_at: DateTime<Utc>,
    pub options: SynthesisOptions,
    pub model_name: String,
    pub provider: String,
    pub strategy: String,
    pub prompt_len: usize,
    pub example_count: usize,
    /// `None` until the LLM has answered.
    pub raw_response: Option<String>,
    pub usage: Option<TokenUsage>,
    pub final_code: Option<String>,
    pub counters: FixCounters,
    pub repair_notes: Vec<String>,
    pub repair_duration: Duration,
    pub syntax_valid: bool,
    pub logic_valid: bool,
    pub artifact_path: Option<PathBuf>,
    pub resource_cleanup: bool,
}

impl GenerationAttempt {
    pub fn new(skill_id: impl Into<String>, options: SynthesisOptions) -> Self {
        Self {
            skill_id: skill_id.into(),
            started_at: Utc::now(),
            options,
            model_name: String::new(),
            provider: String::new(),
            strategy: String::new(),
            prompt_len: 0,
            example_count: 0,
            raw_response: None,
            usage: None,
            final_code: None,
            counters: FixCounters::default(),
            repair_notes: Vec::new(),
            repair_duration: Duration::ZERO,
            syntax_valid: false,
            logic_valid: false,
            artifact_path: None,
            resource_cleanup: false,
        }
    }

    /// Binary syntax score: 100 when the final code parses, 0 otherwise.
    pub fn score_syntax(&self) -> u8 {
        if self.syntax_valid {
            100
        } else {
            0
        }
    }

    /// Snapshot into a log record.
    ///
    /// `error` is `None` on the success path. Fields that were never
    /// captured keep their failure defaults.
    pub fn to_record(&self, elapsed: Duration, error: Option<&str>) -> ExperimentRecord {
        let mut record = ExperimentRecord::empty(self.skill_id.clone(), self.started_at);
        let usage = self.usage.unwrap_or_default();
        let final_code = self.final_code.clone().unwrap_or_default();

        record.prompt_len = self.prompt_len as u64;
        record.code_len = final_code.chars().count() as u64;
        record.is_valid = self.syntax_valid;
        record.error_msg = match error {
            Some(e) if !e.is_empty() => e.to_string(),
            Some(_) => "unknown error".to_string(),
            None => NO_ERROR.to_string(),
        };
        record.repaired = self.counters.any();
        record.model_name = self.model_name.clone();
        record.provider = self.provider.clone();
        record.model_size_class = self.options.model_size_class.clone();
        record.prompt_level = self.options.prompt_level.clone();
        record.strategy = self.strategy.clone();
        record.raw_response = self
            .raw_response
            .clone()
            .unwrap_or_else(|| LLM_FAILURE_SENTINEL.to_string());
        record.code_digest = if final_code.is_empty() {
            String::new()
        } else {
            ContentDigest::from_bytes(final_code.as_bytes()).to_string()
        };
        record.final_code = final_code;
        record.score_syntax = self.score_syntax();
        record.total_duration_ms = elapsed.as_millis() as u64;
        record.repair_duration_ms = self.repair_duration.as_millis() as u64;
        record.ablation_id = self.options.ablation.id();
        record.regex_fix_count = self.counters.regex_fixes;
        record.ast_repair_count = self.counters.ast_repairs;
        record.logic_fix_count = self.counters.logic_fixes;
        record.prompt_tokens = usage.prompt_tokens;
        record.completion_tokens = usage.completion_tokens;
        record.resource_cleanup = self.resource_cleanup;
        record.example_count = self.example_count as u32;
        record.logic_valid = self.logic_valid;
        record.artifact_path = self
            .artifact_path
            .as_ref()
            .map(|p| p.display().to_string());
        record.repair_notes = self.repair_notes.clone();
        record.success = error.is_none();
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AblationTier;

    #[test]
    fn counters_report_any_repair() {
        let mut c = FixCounters::default();
        assert!(!c.any());
        c.logic_fixes = 1;
        assert!(c.any());
        assert_eq!(c.total(), 1);
    }

    #[test]
    fn failure_record_before_llm_uses_sentinels() {
        let attempt = GenerationAttempt::new(
            "jh_ratio",
            SynthesisOptions::default().with_ablation(AblationTier::Full),
        );
        let record = attempt.to_record(Duration::from_millis(12), Some("boom"));

        assert!(!record.success);
        assert_eq!(record.error_msg, "boom");
        assert_eq!(record.raw_response, LLM_FAILURE_SENTINEL);
        assert_eq!(record.code_len, 0);
        assert!(!record.is_valid);
        assert_eq!(record.score_syntax, 0);
        assert_eq!(record.ablation_id, 3);
        assert!(record.code_digest.is_empty());
    }

    #[test]
    fn success_record_carries_captured_fields() {
        let mut attempt = GenerationAttempt::new("jh_ratio", SynthesisOptions::default());
        attempt.raw_response = Some("```python\nx = 1\n```".to_string());
        attempt.final_code = Some("x = 1\n".to_string());
        attempt.syntax_valid = true;
        attempt.usage = Some(TokenUsage {
            prompt_tokens: 40,
            completion_tokens: 9,
        });
        attempt.counters.regex_fixes = 2;

        let record = attempt.to_record(Duration::from_secs(1), None);
        assert!(record.success);
        assert_eq!(record.error_msg, NO_ERROR);
        assert_eq!(record.code_len, 6);
        assert_eq!(record.score_syntax, 100);
        assert!(record.repaired);
        assert_eq!(record.prompt_tokens, 40);
        assert_eq!(record.total_duration_ms, 1000);
        assert_eq!(record.code_digest.len(), 64);
    }
}
