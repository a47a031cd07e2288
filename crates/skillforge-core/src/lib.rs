//! SkillForge Core Library
//!
//! Self-healing synthesis of skill modules: prompt composition, one LLM
//! call, code extraction, ablation-gated repair, validation, persistence
//! and an unconditional experiment log.

pub mod config;
pub mod contract;
pub mod domain;
pub mod extract;
pub mod metrics;
pub mod obs;
pub mod persist;
pub mod prompt;
pub mod python;
pub mod repair;
pub mod synthesize;
pub mod telemetry;

pub use config::SynthConfig;

pub use domain::{
    AblationTier, FixCounters, GenerationAttempt, ModelProfile, Result, SynthError,
    SynthesisOptions,
};

pub use extract::extract_code;
pub use persist::{ArtifactWriter, ProvenanceHeader};
pub use prompt::{compose_prompt, ComposedPrompt, Strategy};
pub use python::{first_syntax_error, is_valid, validate_syntax, SyntaxIssue, SyntaxVerdict};

pub use repair::{
    HeuristicSyntaxRepair, LogicChecker, LogicDiagnostic, LogicIssue, LogicRepair, LogicVerdict,
    PassOutcome, PassRecord, PassStatus, RepairPipeline, RepairReport, RuleBasedLogicRepair,
    StaticLogicLinter, StructuralPass, SyntaxRepair,
};

pub use synthesize::{SynthesisOutcome, Synthesizer};

pub use metrics::METRICS;
pub use obs::{
    emit_attempt_finished, emit_attempt_started, emit_log_error, emit_persisted, emit_repaired,
    AttemptSpan,
};
pub use telemetry::init_tracing;

/// SkillForge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
