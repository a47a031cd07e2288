//! Global atomic counters for SkillForge observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of an experiment batch).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    attempts_started: AtomicU64,
    attempts_succeeded: AtomicU64,
    attempts_failed: AtomicU64,
    artifacts_written: AtomicU64,
    log_append_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            attempts_started: AtomicU64::new(0),
            attempts_succeeded: AtomicU64::new(0),
            attempts_failed: AtomicU64::new(0),
            artifacts_written: AtomicU64::new(0),
            log_append_failures: AtomicU64::new(0),
        }
    }

    fn bump(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = name, "counter incremented");
    }

    pub fn inc_attempts_started(&self) {
        Self::bump(&self.attempts_started, "attempts_started");
    }

    /// Record how an attempt ended.
    pub fn record_outcome(&self, success: bool) {
        if success {
            Self::bump(&self.attempts_succeeded, "attempts_succeeded");
        } else {
            Self::bump(&self.attempts_failed, "attempts_failed");
        }
    }

    pub fn inc_artifacts_written(&self) {
        Self::bump(&self.artifacts_written, "artifacts_written");
    }

    pub fn inc_log_append_failures(&self) {
        Self::bump(&self.log_append_failures, "log_append_failures");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            attempts_started = self.attempts_started(),
            attempts_succeeded = self.attempts_succeeded(),
            attempts_failed = self.attempts_failed(),
            artifacts_written = self.artifacts_written(),
            log_append_failures = self.log_append_failures(),
        );
    }

    pub fn attempts_started(&self) -> u64 {
        self.attempts_started.load(Ordering::Relaxed)
    }

    pub fn attempts_succeeded(&self) -> u64 {
        self.attempts_succeeded.load(Ordering::Relaxed)
    }

    pub fn attempts_failed(&self) -> u64 {
        self.attempts_failed.load(Ordering::Relaxed)
    }

    pub fn artifacts_written(&self) -> u64 {
        self.artifacts_written.load(Ordering::Relaxed)
    }

    pub fn log_append_failures(&self) -> u64 {
        self.log_append_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.attempts_started,
            &self.attempts_succeeded,
            &self.attempts_failed,
            &self.artifacts_written,
            &self.log_append_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_split_by_success() {
        let m = Metrics::new();
        m.inc_attempts_started();
        m.inc_attempts_started();
        m.record_outcome(true);
        m.record_outcome(false);
        m.inc_artifacts_written();
        assert_eq!(m.attempts_started(), 2);
        assert_eq!(m.attempts_succeeded(), 1);
        assert_eq!(m.attempts_failed(), 1);
        assert_eq!(m.artifacts_written(), 1);
        assert_eq!(m.log_append_failures(), 0);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_attempts_started();
        m.inc_log_append_failures();
        m.reset();
        assert_eq!(m.attempts_started(), 0);
        assert_eq!(m.log_append_failures(), 0);
    }
}
