//! Prompt composition.
//!
//! Composition is a pure function of the skill id, the explicit
//! [`ModelProfile`] and the library entry. Missing inputs degrade the
//! instructions; they never fail.

use serde::{Deserialize, Serialize};
use skillforge_store::{ReferenceExample, SkillEntry};

use crate::contract::authoring_rules;
use crate::domain::ModelProfile;

/// Which path produced the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// An Architect Spec matched the active model; examples are mirrored.
    ArchitectMirroring,
    /// No matching spec; built from the legacy free-text description.
    LegacyDescription,
}

impl Strategy {
    pub fn label(self) -> &'static str {
        match self {
            Strategy::ArchitectMirroring => "architect_mirroring",
            Strategy::LegacyDescription => "legacy_description",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A composed prompt plus what went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub text: String,
    pub strategy: Strategy,
    /// Reference examples retrieved for the skill.
    pub example_count: usize,
}

/// The 1:1 pairing directive between reference examples and generated
/// variants.
pub fn mirroring_protocol(examples: &[ReferenceExample]) -> String {
    let mut out = String::from("[MIRRORING PROTOCOL]\n");
    if examples.is_empty() {
        out.push_str(
            "No reference examples are available. Derive every variant directly from the \
             skill definition above.\n",
        );
        return out;
    }

    out.push_str(&format!(
        "The module must produce {} variants. Variant i follows reference example i.\n",
        examples.len()
    ));
    for (i, example) in examples.iter().enumerate() {
        let ordinal = i + 1;
        out.push_str(&format!(
            "- Variant {ordinal} MUST follow the exact mathematical model of Example {ordinal}. \
             Keep its proper nouns and context; do not invent a new scenario.\n  \
             Example {ordinal}: {}\n  Answer {ordinal}: {}\n",
            example.problem.trim(),
            example.answer.trim(),
        ));
    }
    out
}

/// Build the prompt for one skill.
pub fn compose_prompt(skill_id: &str, model: &ModelProfile, entry: &SkillEntry) -> ComposedPrompt {
    let rules = authoring_rules();
    let example_count = entry.examples.len();

    if let Some(spec) = entry.spec_for(&model.tag) {
        let text = format!(
            "You are generating the Python skill module `{skill_id}`.\n\n\
             [ARCHITECT SPEC]\n{}\n\n{}\n{rules}",
            spec.spec.trim(),
            mirroring_protocol(&entry.examples),
        );
        return ComposedPrompt {
            text,
            strategy: Strategy::ArchitectMirroring,
            example_count,
        };
    }

    let description = entry
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or("(no description available; infer the skill from its id)");
    let text = format!(
        "You are generating the Python skill module `{skill_id}`.\n\n\
         [SKILL DESCRIPTION]\n{description}\n\n{rules}"
    );
    ComposedPrompt {
        text,
        strategy: Strategy::LegacyDescription,
        example_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillforge_store::ArchitectSpec;

    fn model(tag: &str) -> ModelProfile {
        ModelProfile::new("coder", "qwen2.5-coder:14b", "ollama", tag)
    }

    #[test]
    fn matching_spec_builds_mirroring_prompt() {
        let entry = SkillEntry::new("jh_ratio")
            .with_spec(ArchitectSpec::new("local_14b", "Simplify a ratio a:b."))
            .with_example(ReferenceExample::new("小明有 6 顆蘋果，小華有 8 顆，比為何？", "3:4"))
            .with_example(ReferenceExample::new("化簡 10:15", "2:3"));

        let prompt = compose_prompt("jh_ratio", &model("local_14b"), &entry);
        assert_eq!(prompt.strategy, Strategy::ArchitectMirroring);
        assert_eq!(prompt.example_count, 2);
        assert!(prompt.text.contains("Simplify a ratio a:b."));
        assert!(prompt.text.contains("Variant 1 MUST follow the exact mathematical model of Example 1"));
        assert!(prompt.text.contains("Variant 2 MUST follow"));
        assert!(prompt.text.contains("小明"));
        assert!(prompt.text.contains("NON-NEGOTIABLE AUTHORING RULES"));
    }

    #[test]
    fn spec_for_other_model_falls_back_to_legacy() {
        let entry = SkillEntry::new("jh_ratio")
            .with_description("Ratios in lowest terms")
            .with_spec(ArchitectSpec::new("cloud_pro", "cloud only"));

        let prompt = compose_prompt("jh_ratio", &model("local_14b"), &entry);
        assert_eq!(prompt.strategy, Strategy::LegacyDescription);
        assert!(prompt.text.contains("Ratios in lowest terms"));
        assert!(!prompt.text.contains("cloud only"));
        assert!(prompt.text.contains("NON-NEGOTIABLE AUTHORING RULES"));
    }

    #[test]
    fn empty_entry_still_composes() {
        let prompt = compose_prompt("jh_unknown", &model("any"), &SkillEntry::new("jh_unknown"));
        assert_eq!(prompt.strategy, Strategy::LegacyDescription);
        assert!(prompt.text.contains("jh_unknown"));
        assert_eq!(prompt.example_count, 0);
    }

    #[test]
    fn mirroring_without_examples_degrades() {
        let protocol = mirroring_protocol(&[]);
        assert!(protocol.contains("Derive every variant directly from the skill definition"));
    }

    #[test]
    fn composition_is_deterministic() {
        let entry = SkillEntry::new("jh_a").with_description("x");
        let a = compose_prompt("jh_a", &model("t"), &entry);
        let b = compose_prompt("jh_a", &model("t"), &entry);
        assert_eq!(a, b);
    }
}
