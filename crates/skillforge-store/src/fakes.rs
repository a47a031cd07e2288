//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemorySkillLibrary` and `MemoryExperimentLog` that satisfy the
//! trait contracts without touching the filesystem or a database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::schema::{ExperimentRecord, SkillEntry};
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemorySkillLibrary
// ---------------------------------------------------------------------------

/// In-memory skill library backed by a `BTreeMap<skill_id, SkillEntry>`.
#[derive(Debug, Default)]
pub struct MemorySkillLibrary {
    entries: Mutex<BTreeMap<String, SkillEntry>>,
    fail_lookups: AtomicBool,
}

impl MemorySkillLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, keyed by its `skill_id`.
    pub fn insert(&self, entry: SkillEntry) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(entry.skill_id.clone(), entry);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_entry(self, entry: SkillEntry) -> Self {
        self.insert(entry);
        self
    }

    /// Make every subsequent lookup fail with a backend error.
    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SkillLibrary for MemorySkillLibrary {
    async fn entry(&self, skill_id: &str) -> StorageResult<SkillEntry> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("library unavailable".to_string()));
        }
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(skill_id)
            .cloned()
            .unwrap_or_else(|| SkillEntry::new(skill_id)))
    }

    async fn skill_ids(&self) -> StorageResult<Vec<String>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryExperimentLog
// ---------------------------------------------------------------------------

/// In-memory experiment log backed by a `Vec<ExperimentRecord>`.
#[derive(Debug, Default)]
pub struct MemoryExperimentLog {
    records: Mutex<Vec<ExperimentRecord>>,
    reject_appends: AtomicBool,
}

impl MemoryExperimentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log whose `append` always fails, for exercising the log-error path.
    pub fn rejecting() -> Self {
        let log = Self::default();
        log.reject_appends.store(true, Ordering::SeqCst);
        log
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ExperimentLog for MemoryExperimentLog {
    async fn append(&self, record: &ExperimentRecord) -> StorageResult<()> {
        if self.reject_appends.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("log store rejected append".to_string()));
        }
        let mut records = self.records.lock().unwrap();
        records.push(record.clone());
        Ok(())
    }

    async fn entries(&self) -> StorageResult<Vec<ExperimentRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }
}
