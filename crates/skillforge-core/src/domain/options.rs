//! Per-call experiment configuration and the explicit model profile.

use serde::{Deserialize, Serialize};

use super::error::SynthError;

/// Repair tier selected for an attempt.
///
/// Tiers are monotonic: `Full` runs everything `Structural` runs, which in
/// turn runs everything `Bare` runs (nothing).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AblationTier {
    /// Tier 1: no repair, the control condition.
    #[default]
    Bare,
    /// Tier 2: structural text rewrites.
    Structural,
    /// Tier 3: structural rewrites plus syntax and logic repair.
    Full,
}

impl AblationTier {
    pub const ALL: [AblationTier; 3] = [
        AblationTier::Bare,
        AblationTier::Structural,
        AblationTier::Full,
    ];

    pub fn id(self) -> u8 {
        match self {
            AblationTier::Bare => 1,
            AblationTier::Structural => 2,
            AblationTier::Full => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AblationTier::Bare => "bare",
            AblationTier::Structural => "structural",
            AblationTier::Full => "full",
        }
    }

    /// Whether the structural rewrite passes run.
    pub fn runs_structural(self) -> bool {
        self >= AblationTier::Structural
    }

    /// Whether syntax and logic repair run.
    pub fn runs_semantic(self) -> bool {
        self == AblationTier::Full
    }
}

impl TryFrom<u8> for AblationTier {
    type Error = SynthError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(AblationTier::Bare),
            2 => Ok(AblationTier::Structural),
            3 => Ok(AblationTier::Full),
            other => Err(SynthError::InvalidAblation(other)),
        }
    }
}

impl From<AblationTier> for u8 {
    fn from(tier: AblationTier) -> u8 {
        tier.id()
    }
}

impl std::fmt::Display for AblationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id(), self.label())
    }
}

/// Options recognised by [`Synthesizer::synthesize`](crate::Synthesizer::synthesize).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisOptions {
    #[serde(default)]
    pub ablation: AblationTier,
    /// Free-form experiment label, recorded verbatim.
    #[serde(default = "default_size_class")]
    pub model_size_class: String,
    /// Free-form experiment label, recorded verbatim.
    #[serde(default = "default_prompt_level")]
    pub prompt_level: String,
}

fn default_size_class() -> String {
    "Cloud".to_string()
}

fn default_prompt_level() -> String {
    "Bare".to_string()
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            ablation: AblationTier::default(),
            model_size_class: default_size_class(),
            prompt_level: default_prompt_level(),
        }
    }
}

impl SynthesisOptions {
    pub fn with_ablation(mut self, ablation: AblationTier) -> Self {
        self.ablation = ablation;
        self
    }

    pub fn with_model_size_class(mut self, label: impl Into<String>) -> Self {
        self.model_size_class = label.into();
        self
    }

    pub fn with_prompt_level(mut self, label: impl Into<String>) -> Self {
        self.prompt_level = label.into();
        self
    }
}

/// The code-generation model an attempt runs against.
///
/// Passed explicitly into prompt composition; `tag` selects which Architect
/// Spec applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub role: String,
    pub name: String,
    pub provider: String,
    pub tag: String,
}

impl ModelProfile {
    pub fn new(
        role: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            name: name.into(),
            provider: provider.into(),
            tag: tag.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_the_control_condition() {
        let opts = SynthesisOptions::default();
        assert_eq!(opts.ablation, AblationTier::Bare);
        assert_eq!(opts.ablation.id(), 1);
        assert_eq!(opts.model_size_class, "Cloud");
        assert_eq!(opts.prompt_level, "Bare");
    }

    #[test]
    fn tier_conversion_rejects_out_of_range() {
        assert_eq!(AblationTier::try_from(2).unwrap(), AblationTier::Structural);
        assert!(matches!(
            AblationTier::try_from(0),
            Err(SynthError::InvalidAblation(0))
        ));
        assert!(AblationTier::try_from(4).is_err());
    }

    #[test]
    fn tiers_are_monotonic() {
        assert!(!AblationTier::Bare.runs_structural());
        assert!(AblationTier::Structural.runs_structural());
        assert!(!AblationTier::Structural.runs_semantic());
        assert!(AblationTier::Full.runs_structural());
        assert!(AblationTier::Full.runs_semantic());
    }

    #[test]
    fn options_deserialize_with_omitted_fields() {
        let opts: SynthesisOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, SynthesisOptions::default());

        let opts: SynthesisOptions = serde_json::from_str(r#"{"ablation": 3}"#).unwrap();
        assert_eq!(opts.ablation, AblationTier::Full);
        assert!(serde_json::from_str::<SynthesisOptions>(r#"{"ablation": 9}"#).is_err());
    }
}
