//! Newline-delimited JSON experiment log.
//!
//! Each record is serialized to a single line and written with one
//! `write_all` call on a handle opened in append mode, so concurrent
//! writers on the same host never interleave within a line.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::schema::ExperimentRecord;
use crate::storage_traits::{ExperimentLog, StorageResult};

/// Append-only JSONL log file.
#[derive(Debug, Clone)]
pub struct JsonlExperimentLog {
    path: PathBuf,
}

impl JsonlExperimentLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ExperimentLog for JsonlExperimentLog {
    async fn append(&self, record: &ExperimentRecord) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        debug!(record_id = %record.record_id, path = %self.path.display(), "experiment record appended");
        Ok(())
    }

    async fn entries(&self) -> StorageResult<Vec<ExperimentRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ExperimentRecord>(line) {
                Ok(record) => records.push(record),
                // A torn trailing line from a crashed writer must not hide the rest.
                Err(e) => warn!(line = idx + 1, error = %e, "skipping unreadable experiment record"),
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn appends_and_reads_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlExperimentLog::new(dir.path().join("nested/log.jsonl"));

        let a = ExperimentRecord::empty("jh_a", Utc::now());
        let b = ExperimentRecord::empty("jh_b", Utc::now());
        log.append(&a).await.unwrap();
        log.append(&b).await.unwrap();

        let entries = log.entries().await.unwrap();
        assert_eq!(entries, vec![a, b]);

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlExperimentLog::new(dir.path().join("absent.jsonl"));
        assert!(log.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn torn_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlExperimentLog::new(dir.path().join("log.jsonl"));
        let a = ExperimentRecord::empty("jh_a", Utc::now());
        log.append(&a).await.unwrap();
        {
            use std::io::Write;
            let mut f = std::fs::OpenOptions::new()
                .append(true)
                .open(log.path())
                .unwrap();
            f.write_all(b"{\"skill_id\": \"jh_b\", \"tru").unwrap();
        }
        assert_eq!(log.entries().await.unwrap(), vec![a]);
    }
}
