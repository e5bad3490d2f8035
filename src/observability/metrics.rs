//! Planner counters
//!
//! Counters only, monotonic, reset on process start.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one isolate registry
///
/// All counters use Relaxed atomics; readers tolerate momentary skew
/// between counters.
#[derive(Debug, Default)]
pub struct PlannerMetrics {
    isolates_created: AtomicU64,
    isolates_released: AtomicU64,
    isolates_exhausted: AtomicU64,
    stale_handle_uses: AtomicU64,
    plans_succeeded: AtomicU64,
    plans_failed: AtomicU64,
    catalog_cache_hits: AtomicU64,
}

impl PlannerMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_isolates_created(&self) {
        self.isolates_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_isolates_released(&self) {
        self.isolates_released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_isolates_exhausted(&self) {
        self.isolates_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stale_handle_uses(&self) {
        self.stale_handle_uses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_plans_succeeded(&self) {
        self.plans_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_plans_failed(&self) {
        self.plans_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_catalog_cache_hits(&self) {
        self.catalog_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            isolates_created: self.isolates_created.load(Ordering::Relaxed),
            isolates_released: self.isolates_released.load(Ordering::Relaxed),
            isolates_exhausted: self.isolates_exhausted.load(Ordering::Relaxed),
            stale_handle_uses: self.stale_handle_uses.load(Ordering::Relaxed),
            plans_succeeded: self.plans_succeeded.load(Ordering::Relaxed),
            plans_failed: self.plans_failed.load(Ordering::Relaxed),
            catalog_cache_hits: self.catalog_cache_hits.load(Ordering::Relaxed),
        }
    }

    /// All counters as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub isolates_created: u64,
    pub isolates_released: u64,
    pub isolates_exhausted: u64,
    pub stale_handle_uses: u64,
    pub plans_succeeded: u64,
    pub plans_failed: u64,
    pub catalog_cache_hits: u64,
}

impl MetricsSnapshot {
    /// Isolates created and not yet released
    pub fn live_isolates(&self) -> u64 {
        self.isolates_created.saturating_sub(self.isolates_released)
    }
}
