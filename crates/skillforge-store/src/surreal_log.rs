//! SurrealDB-backed ExperimentLog implementation

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::migrations;
use crate::schema::ExperimentRecord;
use crate::storage_traits::{ExperimentLog, StorageResult};

const NAMESPACE: &str = "skillforge";
const DATABASE: &str = "experiments";

/// SurrealDB-backed implementation of [`ExperimentLog`].
pub struct SurrealExperimentLog {
    db: Surreal<Any>,
}

impl SurrealExperimentLog {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `skillforge/experiments`, and runs `init_schema`.
    pub async fn in_memory() -> StorageResult<Self> {
        Self::connect("mem://").await
    }

    /// Connect to any SurrealDB endpoint (`mem://`, `surrealkv://path`, `ws://host`).
    pub async fn connect(url: &str) -> StorageResult<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        info!("SurrealExperimentLog connected ({})", url);
        Ok(Self { db })
    }

    /// Connect using `SURREALDB_URL`, if set.
    pub async fn from_env() -> StorageResult<Option<Self>> {
        match std::env::var("SURREALDB_URL") {
            Ok(url) if !url.trim().is_empty() => Ok(Some(Self::connect(url.trim()).await?)),
            _ => Ok(None),
        }
    }

    async fn select(&self, skill_id: Option<&str>) -> StorageResult<Vec<ExperimentRecord>> {
        let mut res = match skill_id {
            Some(id) => self
                .db
                .query("SELECT * OMIT id FROM experiment_log WHERE skill_id = $sid")
                .bind(("sid", id.to_string()))
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?,
            None => self
                .db
                .query("SELECT * OMIT id FROM experiment_log")
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?,
        };

        let mut rows: Vec<ExperimentRecord> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        // Record ids carry no insertion order; RFC 3339 strings do not sort reliably either.
        rows.sort_by_key(|r| r.start_time);
        Ok(rows)
    }
}

#[async_trait]
impl ExperimentLog for SurrealExperimentLog {
    async fn append(&self, record: &ExperimentRecord) -> StorageResult<()> {
        debug!(record_id = %record.record_id, skill_id = %record.skill_id, "appending experiment record");

        self.db
            .query("CREATE experiment_log CONTENT $record")
            .bind(("record", record.clone()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn entries(&self) -> StorageResult<Vec<ExperimentRecord>> {
        self.select(None).await
    }

    async fn entries_for(&self, skill_id: &str) -> StorageResult<Vec<ExperimentRecord>> {
        self.select(Some(skill_id)).await
    }
}
