//! Domain models for SkillForge synthesis.
//!
//! - `SynthesisOptions` / `AblationTier`: per-call experiment configuration
//! - `ModelProfile`: the explicit code-generation model
//! - `GenerationAttempt`: ephemeral per-invocation state
//! - `SynthError`: failures that abort an attempt

pub mod attempt;
pub mod error;
pub mod options;

pub use attempt::{FixCounters, GenerationAttempt};
pub use error::{Result, SynthError};
pub use options::{AblationTier, ModelProfile, SynthesisOptions};
