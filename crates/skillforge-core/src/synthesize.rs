//! Synthesis orchestration.
//!
//! One call runs: library lookup, prompt composition, a single LLM
//! invocation, extraction, tier-gated repair, validation and persistence.
//! Whatever happens, exactly one [`ExperimentRecord`] is appended to the
//! experiment log before the call returns.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use skillforge_llm::LlmClient;
use skillforge_store::{validate_skill_id, ExperimentLog, ExperimentRecord, SkillEntry, SkillLibrary};
use tracing::{debug, warn};

use crate::config::SynthConfig;
use crate::domain::{GenerationAttempt, ModelProfile, Result, SynthesisOptions};
use crate::extract::extract_code;
use crate::metrics::METRICS;
use crate::obs::{
    emit_attempt_finished, emit_attempt_started, emit_llm_returned, emit_log_error,
    emit_persisted, emit_repaired, AttemptSpan,
};
use crate::persist::{ArtifactWriter, ProvenanceHeader};
use crate::prompt::{compose_prompt, ComposedPrompt};
use crate::python::validate_syntax;
use crate::repair::RepairPipeline;

/// What the caller gets back: the `(success, message)` pair plus the
/// record that was logged.
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub success: bool,
    pub message: String,
    pub artifact_path: Option<PathBuf>,
    pub record: ExperimentRecord,
}

/// The self-healing synthesis pipeline.
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    library: Arc<dyn SkillLibrary>,
    log: Arc<dyn ExperimentLog>,
    writer: ArtifactWriter,
    pipeline: RepairPipeline,
    model_role: String,
    model_tag: String,
}

impl Synthesizer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        library: Arc<dyn SkillLibrary>,
        log: Arc<dyn ExperimentLog>,
        writer: ArtifactWriter,
    ) -> Self {
        let defaults = SynthConfig::default();
        Self {
            llm,
            library,
            log,
            writer,
            pipeline: RepairPipeline::new(),
            model_role: defaults.model_role,
            model_tag: defaults.model_tag,
        }
    }

    /// Wire a synthesizer from process configuration.
    pub fn from_config(
        config: &SynthConfig,
        llm: Arc<dyn LlmClient>,
        library: Arc<dyn SkillLibrary>,
        log: Arc<dyn ExperimentLog>,
    ) -> Self {
        Self::new(llm, library, log, config.writer())
            .with_model(config.model_role.clone(), config.model_tag.clone())
    }

    pub fn with_model(mut self, role: impl Into<String>, tag: impl Into<String>) -> Self {
        self.model_role = role.into();
        self.model_tag = tag.into();
        self
    }

    pub fn with_pipeline(mut self, pipeline: RepairPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// The active model, as threaded into prompt composition.
    pub fn model_profile(&self) -> ModelProfile {
        ModelProfile::new(
            self.model_role.clone(),
            self.llm.model_name(&self.model_role),
            self.llm.provider(),
            self.model_tag.clone(),
        )
    }

    /// Library entry for `skill_id`; lookup failures degrade to an empty
    /// entry.
    async fn library_entry(&self, skill_id: &str) -> SkillEntry {
        match self.library.entry(skill_id).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(skill_id = %skill_id, error = %e, "skill library lookup failed, using empty entry");
                SkillEntry::new(skill_id)
            }
        }
    }

    /// Compose the prompt an attempt for `skill_id` would send.
    pub async fn compose(&self, skill_id: &str) -> ComposedPrompt {
        let entry = self.library_entry(skill_id).await;
        compose_prompt(skill_id, &self.model_profile(), &entry)
    }

    /// Run one attempt. Never fails: errors become `success = false` with
    /// the error text as message, and are logged like any other outcome.
    pub async fn synthesize(&self, skill_id: &str, options: SynthesisOptions) -> SynthesisOutcome {
        let started = Instant::now();
        let _span = AttemptSpan::enter(skill_id);
        let profile = self.model_profile();

        METRICS.inc_attempts_started();
        emit_attempt_started(skill_id, options.ablation, &profile.name);

        let mut attempt = GenerationAttempt::new(skill_id, options);
        attempt.model_name = profile.name.clone();
        attempt.provider = profile.provider.clone();

        let result = self.run_attempt(&mut attempt, &profile, started).await;
        attempt.resource_cleanup = self.llm.release_resources(&profile.role).await;

        let elapsed = started.elapsed();
        let (success, mut message) = match &result {
            Ok(message) => (true, message.clone()),
            Err(e) => (false, e.to_string()),
        };
        let error = result.as_ref().err().map(ToString::to_string);
        let record = attempt.to_record(elapsed, error.as_deref());

        if let Err(e) = self.log.append(&record).await {
            METRICS.inc_log_append_failures();
            emit_log_error(skill_id, &e);
            message.push_str(&format!(" (experiment log write failed: {e})"));
        }

        METRICS.record_outcome(success);
        emit_attempt_finished(skill_id, elapsed.as_millis() as u64, success);

        SynthesisOutcome {
            success,
            message,
            artifact_path: attempt.artifact_path,
            record,
        }
    }

    async fn run_attempt(
        &self,
        attempt: &mut GenerationAttempt,
        profile: &ModelProfile,
        started: Instant,
    ) -> Result<String> {
        let skill_id = validate_skill_id(&attempt.skill_id)?.to_string();

        let entry = self.library_entry(&skill_id).await;
        let prompt = compose_prompt(&skill_id, profile, &entry);
        attempt.strategy = prompt.strategy.label().to_string();
        attempt.prompt_len = prompt.text.chars().count();
        attempt.example_count = prompt.example_count;
        debug!(strategy = %prompt.strategy, prompt_len = attempt.prompt_len, "prompt composed");

        let completion = self.llm.invoke(&profile.role, &prompt.text).await?;
        attempt.usage = completion.usage;
        emit_llm_returned(
            &skill_id,
            completion.text.len(),
            completion.usage.map(|u| u.completion_tokens).unwrap_or(0),
        );
        let extracted = extract_code(&completion.text);
        attempt.raw_response = Some(completion.text);

        let repair_started = Instant::now();
        let report = self.pipeline.run(&extracted, attempt.options.ablation);
        attempt.repair_duration = repair_started.elapsed();
        attempt.counters = report.counters;
        attempt.repair_notes = report.notes();
        emit_repaired(
            &skill_id,
            &report.counters,
            attempt.repair_duration.as_millis() as u64,
        );

        let verdict = validate_syntax(&report.text);
        attempt.syntax_valid = verdict.is_valid;
        attempt.logic_valid = self.pipeline.checker().check(&report.text).is_valid;
        attempt.final_code = Some(report.text);

        // Invalid code is persisted too; the header marks it.
        let header = ProvenanceHeader {
            skill_id: skill_id.clone(),
            model_name: attempt.model_name.clone(),
            strategy: attempt.strategy.clone(),
            ablation: attempt.options.ablation,
            elapsed: started.elapsed(),
            example_count: attempt.example_count,
            created_at: Utc::now(),
            syntax: verdict,
        };
        let code = attempt.final_code.as_deref().unwrap_or_default();
        let path = self.writer.write(&header, code)?;
        METRICS.inc_artifacts_written();
        emit_persisted(&skill_id, &path, attempt.syntax_valid);
        attempt.artifact_path = Some(path.clone());

        let validity = if attempt.syntax_valid {
            "syntax valid"
        } else {
            "syntax INVALID"
        };
        Ok(format!(
            "generated {skill_id} ({validity}, {} fixes) -> {}",
            attempt.counters.total(),
            path.display()
        ))
    }
}
