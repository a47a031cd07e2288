//! Structured observability hooks for the synthesis attempt lifecycle.
//!
//! This module provides:
//! - Attempt-scoped tracing spans via the `AttemptSpan` RAII guard
//! - Emission functions for lifecycle events: started, LLM returned,
//!   repaired, persisted, finished, log error
//!
//! Events are emitted at `info!` level (filter with `SKILLFORGE_LOG`).

use tracing::info;

use crate::domain::{AblationTier, FixCounters};

/// RAII guard that tags every event of one attempt with its skill id.
///
/// # Example
///
/// ```ignore
/// let _span = AttemptSpan::enter("jh_ratio");
/// // tracing calls here carry skill_id = "jh_ratio"
/// ```
pub struct AttemptSpan {
    _span: tracing::span::EnteredSpan,
}

impl AttemptSpan {
    pub fn enter(skill_id: &str) -> Self {
        let span = tracing::info_span!("skillforge.attempt", skill_id = %skill_id);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_attempt_started(skill_id: &str, ablation: AblationTier, model: &str) {
    info!(
        event = "attempt.started",
        skill_id = %skill_id,
        ablation_id = ablation.id(),
        model = %model,
    );
}

pub fn emit_llm_returned(skill_id: &str, response_len: usize, completion_tokens: u64) {
    info!(
        event = "attempt.llm_returned",
        skill_id = %skill_id,
        response_len = response_len,
        completion_tokens = completion_tokens,
    );
}

/// Emit event: repair stage finished with its counters.
pub fn emit_repaired(skill_id: &str, counters: &FixCounters, repair_ms: u64) {
    info!(
        event = "attempt.repaired",
        skill_id = %skill_id,
        regex_fixes = counters.regex_fixes,
        ast_repairs = counters.ast_repairs,
        logic_fixes = counters.logic_fixes,
        repair_ms = repair_ms,
    );
}

pub fn emit_persisted(skill_id: &str, path: &std::path::Path, syntax_valid: bool) {
    info!(
        event = "attempt.persisted",
        skill_id = %skill_id,
        path = %path.display(),
        syntax_valid = syntax_valid,
    );
}

/// Emit event: attempt finished, on success and failure alike.
pub fn emit_attempt_finished(skill_id: &str, duration_ms: u64, success: bool) {
    info!(
        event = "attempt.finished",
        skill_id = %skill_id,
        duration_ms = duration_ms,
        success = success,
    );
}

/// Emit event: the experiment log rejected a record (warning level).
pub fn emit_log_error(skill_id: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "attempt.log_error", skill_id = %skill_id, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_and_events_do_not_panic_without_subscriber() {
        let _span = AttemptSpan::enter("jh_ratio");
        emit_attempt_started("jh_ratio", AblationTier::Full, "m");
        emit_repaired("jh_ratio", &FixCounters::default(), 3);
        emit_attempt_finished("jh_ratio", 10, true);
    }
}
