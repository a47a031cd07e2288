//! Filesystem-backed skill library.
//!
//! Layout: `<root>/<skill_id>.json`, one document per skill:
//!
//! ```text
//! {
//!   "skill_id": "jh_fraction_add",
//!   "description": "...",
//!   "architect_specs": [{ "model_tag": "cloud_pro", "spec": "..." }],
//!   "examples": [{ "problem": "...", "answer": "..." }]
//! }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageError;
use crate::schema::SkillEntry;
use crate::storage_traits::{validate_skill_id, SkillLibrary, StorageResult};

/// Skill library reading one JSON document per skill id.
#[derive(Debug, Clone)]
pub struct FsSkillLibrary {
    root: PathBuf,
}

impl FsSkillLibrary {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, skill_id: &str) -> StorageResult<PathBuf> {
        let key = validate_skill_id(skill_id)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

#[async_trait]
impl SkillLibrary for FsSkillLibrary {
    async fn entry(&self, skill_id: &str) -> StorageResult<SkillEntry> {
        let path = self.entry_path(skill_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(skill_id = %skill_id, path = %path.display(), "no library entry");
                return Ok(SkillEntry::new(skill_id));
            }
            Err(e) => return Err(e.into()),
        };

        let mut entry: SkillEntry =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::MalformedEntry {
                skill_id: skill_id.to_string(),
                reason: e.to_string(),
            })?;
        if entry.skill_id.is_empty() {
            entry.skill_id = skill_id.to_string();
        }
        Ok(entry)
    }

    async fn skill_ids(&self) -> StorageResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_skill_id(stem).is_ok() {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ArchitectSpec, ReferenceExample};

    #[tokio::test]
    async fn missing_entry_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let lib = FsSkillLibrary::new(dir.path());
        let entry = lib.entry("jh_unknown").await.unwrap();
        assert_eq!(entry.skill_id, "jh_unknown");
        assert!(entry.architect_specs.is_empty());
        assert!(entry.description.is_none());
    }

    #[tokio::test]
    async fn reads_entry_and_lists_ids() {
        let dir = tempfile::tempdir().unwrap();
        let entry = SkillEntry::new("jh_fraction_add")
            .with_description("add two fractions")
            .with_spec(ArchitectSpec::new("cloud_pro", "use unlike denominators"))
            .with_example(ReferenceExample::new("1/2 + 1/3 = ?", "5/6"));
        std::fs::write(
            dir.path().join("jh_fraction_add.json"),
            serde_json::to_vec(&entry).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let lib = FsSkillLibrary::new(dir.path());
        assert_eq!(lib.entry("jh_fraction_add").await.unwrap(), entry);
        assert_eq!(lib.skill_ids().await.unwrap(), vec!["jh_fraction_add"]);
    }

    #[tokio::test]
    async fn malformed_entry_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        let lib = FsSkillLibrary::new(dir.path());
        let err = lib.entry("broken").await.unwrap_err();
        assert!(matches!(err, StorageError::MalformedEntry { .. }));
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let lib = FsSkillLibrary::new(dir.path());
        let err = lib.entry("../secrets").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidSkillId(_)));
    }
}
