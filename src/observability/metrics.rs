//! Validation counters
//!
//! - Counters only, monotonic
//! - Thread-safe, lock-free
//! - Never read by the validation logic itself

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Registry of validation counters.
///
/// Uses Relaxed ordering; counters are independent of one another.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Records passed to `validate`
    records_validated: AtomicU64,
    /// Records that failed validation
    records_rejected: AtomicU64,
    /// Violations across all rejected records
    violations: AtomicU64,
    /// Undeclared keys kept under `allow-and-report`
    extra_fields_detected: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_records_validated(&self) {
        self.records_validated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_records_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_violations(&self, count: u64) {
        self.violations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_extra_fields(&self) {
        self.extra_fields_detected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_validated: self.records_validated.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            violations: self.violations.load(Ordering::Relaxed),
            extra_fields_detected: self.extra_fields_detected.load(Ordering::Relaxed),
        }
    }

    /// Get current snapshot of all metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or(serde_json::Value::Null)
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_validated: u64,
    pub records_rejected: u64,
    pub violations: u64,
    pub extra_fields_detected: u64,
}
