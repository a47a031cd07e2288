//! SurrealDB schema migrations and initialization
//!
//! Sets up the `experiment_log` table. Safe to call on every connection.

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::storage_traits::StorageResult;

/// Initialize all SkillForge tables in SurrealDB (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> StorageResult<()> {
    info!("Initializing SkillForge SurrealDB schema");
    init_experiment_log_table(db).await?;
    info!("SkillForge schema initialization complete");
    Ok(())
}

/// Initialize `experiment_log` table
///
/// Schema:
/// ```text
/// TABLE experiment_log {
///   record_id:     STRING (unique)
///   skill_id:      STRING (indexed)
///   start_time:    STRING (RFC 3339, indexed)
///   ablation_id:   INT (indexed)
///   ...            remaining ExperimentRecord columns
/// }
/// ```
///
/// Rows are append-only: updates and deletes are not permitted.
async fn init_experiment_log_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing experiment_log table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS experiment_log AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update NONE
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_record_id ON TABLE experiment_log COLUMNS record_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_skill_id ON TABLE experiment_log COLUMNS skill_id;
        DEFINE INDEX IF NOT EXISTS idx_start_time ON TABLE experiment_log COLUMNS start_time;
        DEFINE INDEX IF NOT EXISTS idx_ablation ON TABLE experiment_log COLUMNS ablation_id, skill_id;
    "#;

    db.query(sql).await?.check()?;
    debug!("experiment_log table initialized");
    Ok(())
}
