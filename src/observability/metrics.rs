//! Process-wide counters
//!
//! - Counters only
//! - Monotonic increase, reset only on process start
//! - Relaxed atomics, no locks

use std::sync::atomic::{AtomicU64, Ordering};

static METRICS: MetricsRegistry = MetricsRegistry::new();

/// Returns the process-wide registry.
pub fn metrics() -> &'static MetricsRegistry {
    &METRICS
}

/// Operational counters of the record core
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    records_validated: AtomicU64,
    validation_failures: AtomicU64,
    decode_anomalies: AtomicU64,
    relation_targets_missing: AtomicU64,
    mirror_refreshes_enqueued: AtomicU64,
    records_written: AtomicU64,
    queries_executed: AtomicU64,
    transaction_conflicts: AtomicU64,
}

impl MetricsRegistry {
    /// Create a registry with all counters at zero
    pub const fn new() -> Self {
        Self {
            records_validated: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            decode_anomalies: AtomicU64::new(0),
            relation_targets_missing: AtomicU64::new(0),
            mirror_refreshes_enqueued: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            queries_executed: AtomicU64::new(0),
            transaction_conflicts: AtomicU64::new(0),
        }
    }

    pub fn increment_records_validated(&self) {
        self.records_validated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_validation_failures(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_decode_anomalies(&self) {
        self.decode_anomalies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_relation_targets_missing(&self) {
        self.relation_targets_missing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_mirror_refreshes(&self) {
        self.mirror_refreshes_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_records_written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transaction_conflicts(&self) {
        self.transaction_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_validated: self.records_validated.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            decode_anomalies: self.decode_anomalies.load(Ordering::Relaxed),
            relation_targets_missing: self.relation_targets_missing.load(Ordering::Relaxed),
            mirror_refreshes_enqueued: self.mirror_refreshes_enqueued.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            transaction_conflicts: self.transaction_conflicts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counter values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub records_validated: u64,
    pub validation_failures: u64,
    pub decode_anomalies: u64,
    pub relation_targets_missing: u64,
    pub mirror_refreshes_enqueued: u64,
    pub records_written: u64,
    pub queries_executed: u64,
    pub transaction_conflicts: u64,
}

impl MetricsSnapshot {
    /// Serialize as a JSON object with stable keys
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "decode_anomalies": self.decode_anomalies,
            "mirror_refreshes_enqueued": self.mirror_refreshes_enqueued,
            "queries_executed": self.queries_executed,
            "records_validated": self.records_validated,
            "records_written": self.records_written,
            "relation_targets_missing": self.relation_targets_missing,
            "transaction_conflicts": self.transaction_conflicts,
            "validation_failures": self.validation_failures,
        })
    }
}
