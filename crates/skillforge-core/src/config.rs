//! Process-level configuration for the synthesis pipeline.
//!
//! Read once from the environment and passed explicitly into the
//! [`Synthesizer`](crate::Synthesizer); nothing below consults the
//! environment again.

use std::path::PathBuf;
use std::sync::Arc;

use skillforge_store::{ExperimentLog, FsSkillLibrary, JsonlExperimentLog, SurrealExperimentLog};

use crate::domain::Result;
use crate::persist::ArtifactWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthConfig {
    /// Directory receiving `<skill_id>.py` artifacts.
    pub content_dir: PathBuf,
    /// Directory of `<skill_id>.json` library entries.
    pub library_dir: PathBuf,
    /// JSONL experiment log, used unless `SURREALDB_URL` is set.
    pub log_path: PathBuf,
    /// LLM role used for code generation.
    pub model_role: String,
    /// Tag matched against Architect Specs.
    pub model_tag: String,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("skills"),
            library_dir: PathBuf::from("library"),
            log_path: PathBuf::from("experiments/experiment_log.jsonl"),
            model_role: "coder".to_string(),
            model_tag: "default".to_string(),
        }
    }
}

impl SynthConfig {
    /// Defaults overridden by `SKILLFORGE_CONTENT_DIR`,
    /// `SKILLFORGE_LIBRARY_DIR`, `SKILLFORGE_LOG_PATH`,
    /// `SKILLFORGE_MODEL_ROLE` and `SKILLFORGE_MODEL_TAG`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(dir) = var("SKILLFORGE_CONTENT_DIR") {
            config.content_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("SKILLFORGE_LIBRARY_DIR") {
            config.library_dir = PathBuf::from(dir);
        }
        if let Some(path) = var("SKILLFORGE_LOG_PATH") {
            config.log_path = PathBuf::from(path);
        }
        if let Some(role) = var("SKILLFORGE_MODEL_ROLE") {
            config.model_role = role;
        }
        if let Some(tag) = var("SKILLFORGE_MODEL_TAG") {
            config.model_tag = tag;
        }
        config
    }

    pub fn library(&self) -> FsSkillLibrary {
        FsSkillLibrary::new(&self.library_dir)
    }

    pub fn writer(&self) -> ArtifactWriter {
        ArtifactWriter::new(&self.content_dir)
    }

    /// The experiment log: SurrealDB when `SURREALDB_URL` is set, the JSONL
    /// file otherwise.
    pub async fn experiment_log(&self) -> Result<Arc<dyn ExperimentLog>> {
        if let Some(surreal) = SurrealExperimentLog::from_env().await? {
            tracing::info!(backend = "surrealdb", "experiment log selected");
            return Ok(Arc::new(surreal));
        }
        tracing::info!(backend = "jsonl", path = %self.log_path.display(), "experiment log selected");
        Ok(Arc::new(JsonlExperimentLog::new(&self.log_path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_conventional_locations() {
        let config = SynthConfig::default();
        assert_eq!(config.content_dir, PathBuf::from("skills"));
        assert_eq!(config.log_path, PathBuf::from("experiments/experiment_log.jsonl"));
        assert_eq!(config.model_role, "coder");
        assert_eq!(config.writer().content_dir(), config.content_dir.as_path());
    }
}
