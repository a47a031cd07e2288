//! Artifact persistence with a provenance header.
//!
//! Layout: `<content_dir>/<skill_id>.py`, one file per skill id. Every write
//! replaces the previous artifact (last write wins). Content goes to a
//! temporary file in the same directory and is renamed over the target, so
//! readers never observe a partial file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use skillforge_store::validate_skill_id;
use tempfile::NamedTempFile;

use crate::domain::{AblationTier, Result};
use crate::python::SyntaxVerdict;

const RULE: &str =
    "# ==============================================================================";

/// Provenance recorded at the top of each artifact.
#[derive(Debug, Clone)]
pub struct ProvenanceHeader {
    pub skill_id: String,
    pub model_name: String,
    pub strategy: String,
    pub ablation: AblationTier,
    pub elapsed: Duration,
    pub example_count: usize,
    pub created_at: DateTime<Utc>,
    pub syntax: SyntaxVerdict,
}

impl ProvenanceHeader {
    pub fn render(&self) -> String {
        let syntax = match (self.syntax.is_valid, &self.syntax.issue) {
            (true, _) => "valid".to_string(),
            (false, Some(issue)) => format!("INVALID ({issue})"),
            (false, None) => "INVALID".to_string(),
        };
        format!(
            "{RULE}\n\
             # ID: {}\n\
             # Model: {} | Strategy: {}\n\
             # Ablation: {} | Elapsed: {:.2}s | Examples: {}\n\
             # Created: {}\n\
             # Syntax: {syntax}\n\
             {RULE}\n\n",
            self.skill_id,
            self.model_name,
            self.strategy,
            self.ablation,
            self.elapsed.as_secs_f64(),
            self.example_count,
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }
}

/// Writes skill modules under a fixed content directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    content_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(content_dir: impl AsRef<Path>) -> Self {
        Self {
            content_dir: content_dir.as_ref().to_path_buf(),
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Deterministic artifact path for a skill id.
    pub fn path_for(&self, skill_id: &str) -> Result<PathBuf> {
        let skill_id = validate_skill_id(skill_id)?;
        Ok(self.content_dir.join(format!("{skill_id}.py")))
    }

    /// Write header + code, replacing any previous artifact.
    pub fn write(&self, header: &ProvenanceHeader, code: &str) -> Result<PathBuf> {
        let path = self.path_for(&header.skill_id)?;
        fs::create_dir_all(&self.content_dir)?;

        let mut tmp = NamedTempFile::new_in(&self.content_dir)?;
        tmp.write_all(header.render().as_bytes())?;
        tmp.write_all(code.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(path)
    }
}
