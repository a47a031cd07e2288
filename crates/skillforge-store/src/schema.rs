//! Record types shared by every storage backend.
//!
//! - `SkillEntry`: everything the library knows about one skill id
//!   (Architect Specs, legacy description, reference examples)
//! - `ExperimentRecord`: one append-only row per synthesis invocation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel stored in `error_msg` when an invocation succeeded.
pub const NO_ERROR: &str = "None";

/// Sentinel stored in `raw_response` when the LLM never answered.
pub const LLM_FAILURE_SENTINEL: &str = "LLM invocation failure";

/// A structured, model-tag-scoped instruction template for one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectSpec {
    /// Model tag this spec was authored for (matched against the active model).
    pub model_tag: String,
    /// Spec body embedded verbatim into the composed prompt.
    pub spec: String,
}

impl ArchitectSpec {
    pub fn new(model_tag: impl Into<String>, spec: impl Into<String>) -> Self {
        Self {
            model_tag: model_tag.into(),
            spec: spec.into(),
        }
    }
}

/// One curated (problem text, canonical answer) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceExample {
    pub problem: String,
    pub answer: String,
}

impl ReferenceExample {
    pub fn new(problem: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            problem: problem.into(),
            answer: answer.into(),
        }
    }
}

/// Library entry for a single skill id.
///
/// An absent entry and an empty entry are equivalent: composition degrades
/// to weaker instructions instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    #[serde(default)]
    pub skill_id: String,
    /// Legacy free-text description.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub architect_specs: Vec<ArchitectSpec>,
    /// Ordered reference examples; ordinal `i` pairs with generated variant `i`.
    #[serde(default)]
    pub examples: Vec<ReferenceExample>,
}

impl SkillEntry {
    pub fn new(skill_id: impl Into<String>) -> Self {
        Self {
            skill_id: skill_id.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_spec(mut self, spec: ArchitectSpec) -> Self {
        self.architect_specs.push(spec);
        self
    }

    pub fn with_example(mut self, example: ReferenceExample) -> Self {
        self.examples.push(example);
        self
    }

    /// The Architect Spec authored for `model_tag`, if any.
    pub fn spec_for(&self, model_tag: &str) -> Option<&ArchitectSpec> {
        self.architect_specs
            .iter()
            .find(|s| s.model_tag == model_tag)
    }
}

/// Full snapshot of one generation attempt, written exactly once per invocation.
///
/// Field names are the column names consumed by downstream analysis tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub record_id: Uuid,
    pub skill_id: String,
    pub start_time: DateTime<Utc>,
    pub prompt_len: u64,
    pub code_len: u64,
    pub is_valid: bool,
    /// Exception text, or [`NO_ERROR`] on success.
    pub error_msg: String,
    /// Whether any of the three fix counters is non-zero.
    pub repaired: bool,
    pub model_name: String,
    pub provider: String,
    pub model_size_class: String,
    pub prompt_level: String,
    pub strategy: String,
    pub raw_response: String,
    pub final_code: String,
    /// SHA-256 of `final_code` (empty when no code was produced).
    pub code_digest: String,
    /// Binary proxy: 100 when the final code parses, 0 otherwise.
    pub score_syntax: u8,
    pub total_duration_ms: u64,
    pub repair_duration_ms: u64,
    pub ablation_id: u8,
    pub regex_fix_count: u32,
    pub ast_repair_count: u32,
    pub logic_fix_count: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub resource_cleanup: bool,
    pub example_count: u32,
    pub logic_valid: bool,
    pub artifact_path: Option<String>,
    /// One line per repair sub-pass: `<pass>: <status> (+<fixes>)`.
    #[serde(default)]
    pub repair_notes: Vec<String>,
    pub success: bool,
}

impl ExperimentRecord {
    /// A record with every measurement defaulted, as used on the failure path
    /// before any stage has produced data.
    pub fn empty(skill_id: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            skill_id: skill_id.into(),
            start_time,
            prompt_len: 0,
            code_len: 0,
            is_valid: false,
            error_msg: NO_ERROR.to_string(),
            repaired: false,
            model_name: String::new(),
            provider: String::new(),
            model_size_class: String::new(),
            prompt_level: String::new(),
            strategy: String::new(),
            raw_response: LLM_FAILURE_SENTINEL.to_string(),
            final_code: String::new(),
            code_digest: String::new(),
            score_syntax: 0,
            total_duration_ms: 0,
            repair_duration_ms: 0,
            ablation_id: 1,
            regex_fix_count: 0,
            ast_repair_count: 0,
            logic_fix_count: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            resource_cleanup: false,
            example_count: 0,
            logic_valid: false,
            artifact_path: None,
            repair_notes: Vec::new(),
            success: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_for_matches_model_tag_only() {
        let entry = SkillEntry::new("jh_fraction_add")
            .with_spec(ArchitectSpec::new("local_14b", "small model spec"))
            .with_spec(ArchitectSpec::new("cloud_pro", "cloud spec"));

        assert_eq!(entry.spec_for("cloud_pro").unwrap().spec, "cloud spec");
        assert!(entry.spec_for("edge_7b").is_none());
    }

    #[test]
    fn entry_decodes_with_missing_sections() {
        let entry: SkillEntry =
            serde_json::from_str(r#"{"skill_id": "jh_area", "description": "area"}"#)
                .expect("decode");
        assert!(entry.architect_specs.is_empty());
        assert!(entry.examples.is_empty());
        assert_eq!(entry.description.as_deref(), Some("area"));
    }

    #[test]
    fn empty_record_uses_failure_defaults() {
        let record = ExperimentRecord::empty("jh_area", Utc::now());
        assert_eq!(record.code_len, 0);
        assert!(!record.is_valid);
        assert_eq!(record.raw_response, LLM_FAILURE_SENTINEL);
        assert_eq!(record.score_syntax, 0);
        assert!(!record.success);
    }

    #[test]
    fn record_json_has_analysis_columns() {
        let record = ExperimentRecord::empty("jh_area", Utc::now());
        let v = serde_json::to_value(&record).expect("serialize");
        let obj = v.as_object().expect("object");
        for key in [
            "skill_id",
            "start_time",
            "prompt_len",
            "code_len",
            "is_valid",
            "error_msg",
            "repaired",
            "model_size_class",
            "prompt_level",
            "raw_response",
            "final_code",
            "score_syntax",
            "repair_duration_ms",
            "ablation_id",
            "regex_fix_count",
            "ast_repair_count",
            "logic_fix_count",
            "prompt_tokens",
            "completion_tokens",
            "resource_cleanup",
        ] {
            assert!(obj.contains_key(key), "missing key: {}", key);
        }
    }
}
