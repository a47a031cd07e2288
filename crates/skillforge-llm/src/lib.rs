//! SkillForge LLM: the language-model invocation boundary
//!
//! This crate isolates every network round-trip of the synthesis pipeline
//! behind the [`LlmClient`] trait. The pipeline issues exactly one
//! `invoke` per attempt; retries, deadlines and cancellation belong to the
//! client implementation, never to callers.
//!
//! ## Layer 2 - Integration
//!
//! Focus: a uniform `(text, usage)` contract over heterogeneous providers.

pub mod error;
pub mod fakes;
pub mod openai_compat;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::LlmError;
pub use openai_compat::{LlmConfig, OpenAiCompatClient};

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Raw completion text plus optional usage metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = Some(TokenUsage {
            prompt_tokens,
            completion_tokens,
        });
        self
    }
}

/// A language model reachable for one-shot completions.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `prompt` on behalf of `role` and return the raw completion.
    ///
    /// Transport, auth and quota failures surface as errors; callers treat
    /// any error as a failure of the whole invocation.
    async fn invoke(&self, role: &str, prompt: &str) -> Result<Completion>;

    /// Model name used for `role`, as recorded in provenance headers.
    fn model_name(&self, role: &str) -> String;

    /// Provider label (e.g. `openai`, `ollama`).
    fn provider(&self) -> String;

    /// Release per-call resources held by the backend (e.g. unload a local
    /// model). Returns whether anything was released.
    async fn release_resources(&self, _role: &str) -> bool {
        false
    }
}
