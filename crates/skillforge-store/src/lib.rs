//! SkillForge Store: skill library and experiment log persistence
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: read-only access to upstream-authored skill material and an
//! append-only record of every synthesis attempt.
//!
//! ## Key Components
//!
//! - `SkillLibrary`: Architect Specs, legacy descriptions, reference examples
//! - `ExperimentLog`: one immutable `ExperimentRecord` per invocation
//! - Backends: filesystem/JSONL, SurrealDB, and in-memory fakes

mod error;
pub mod fakes;
pub mod fs_library;
pub mod jsonl_log;
mod migrations;
pub mod schema;
pub mod storage_traits;
pub mod surreal_log;

pub use error::StorageError;
pub use fs_library::FsSkillLibrary;
pub use jsonl_log::JsonlExperimentLog;
pub use schema::{
    ArchitectSpec, ExperimentRecord, ReferenceExample, SkillEntry, LLM_FAILURE_SENTINEL, NO_ERROR,
};
pub use storage_traits::{
    validate_skill_id, ContentDigest, ExperimentLog, SkillLibrary, StorageResult,
};
pub use surreal_log::SurrealExperimentLog;
