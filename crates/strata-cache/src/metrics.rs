//! Cache metrics recording.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Describes the cache metrics to the installed recorder.
/// Call once at startup, after installing an exporter.
pub fn register_cache_metrics() {
    metrics::describe_counter!("strata_cache_hits_total", "Total number of cache hits");
    metrics::describe_counter!("strata_cache_misses_total", "Total number of cache misses");
    metrics::describe_counter!(
        "strata_cache_loads_total",
        "Total number of source loads, by kind (load, reload, revalidate)"
    );
    metrics::describe_counter!(
        "strata_cache_load_failures_total",
        "Total number of failed source loads"
    );
    metrics::describe_counter!(
        "strata_cache_evictions_total",
        "Total number of evicted entries, by reason"
    );
    metrics::describe_gauge!("strata_cache_entries", "Current number of entries per store");
    metrics::describe_histogram!(
        "strata_cache_load_seconds",
        "Time spent waiting on the source"
    );
    metrics::describe_counter!("strata_sweeper_runs_total", "Total number of sweep passes");
    metrics::describe_counter!(
        "strata_sweeper_failures_total",
        "Total number of stores that failed during a sweep"
    );
}

/// Why entries left a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    Dormant,
    Flush,
    Invalidated,
}

impl EvictionReason {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Dormant => "dormant",
            Self::Flush => "flush",
            Self::Invalidated => "invalidated",
        }
    }
}

/// Per-store metrics recorder.
///
/// Keeps atomic counters for in-process inspection and mirrors every event
/// to the `metrics` facade, labelled with the store name.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    store: Arc<str>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    loads: Arc<AtomicU64>,
    reloads: Arc<AtomicU64>,
    revalidations: Arc<AtomicU64>,
    load_failures: Arc<AtomicU64>,
    evictions: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new(store: impl Into<Arc<str>>) -> Self {
        Self {
            store: store.into(),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            loads: Arc::new(AtomicU64::new(0)),
            reloads: Arc::new(AtomicU64::new(0)),
            revalidations: Arc::new(AtomicU64::new(0)),
            load_failures: Arc::new(AtomicU64::new(0)),
            evictions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a cache hit.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!("strata_cache_hits_total", "store" => self.store.to_string()).increment(1);
    }

    /// Records a cache miss.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("strata_cache_misses_total", "store" => self.store.to_string()).increment(1);
    }

    /// Records a first load and how long the source took.
    pub fn record_load(&self, duration: Duration) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.record_source_call("load", duration);
    }

    /// Records a reload and how long the source took.
    pub fn record_reload(&self, duration: Duration) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
        self.record_source_call("reload", duration);
    }

    /// Records an expired entry accepted as unmodified.
    pub fn record_revalidation(&self) {
        self.revalidations.fetch_add(1, Ordering::Relaxed);
        counter!(
            "strata_cache_loads_total",
            "store" => self.store.to_string(),
            "kind" => "revalidate"
        )
        .increment(1);
    }

    /// Records a failed source call.
    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
        counter!("strata_cache_load_failures_total", "store" => self.store.to_string())
            .increment(1);
    }

    /// Records evicted entries.
    pub fn record_evictions(&self, reason: EvictionReason, count: usize) {
        if count == 0 {
            return;
        }
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
        counter!(
            "strata_cache_evictions_total",
            "store" => self.store.to_string(),
            "reason" => reason.as_str()
        )
        .increment(count as u64);
    }

    /// Updates the entries gauge.
    pub fn update_entry_count(&self, count: usize) {
        gauge!("strata_cache_entries", "store" => self.store.to_string()).set(count as f64);
    }

    fn record_source_call(&self, kind: &'static str, duration: Duration) {
        counter!(
            "strata_cache_loads_total",
            "store" => self.store.to_string(),
            "kind" => kind
        )
        .increment(1);
        histogram!(
            "strata_cache_load_seconds",
            "store" => self.store.to_string(),
            "kind" => kind
        )
        .record(duration.as_secs_f64());
    }

    /// Hit rate in `[0, 1]`, for logging.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let misses = self.misses() as f64;
        let total = hits + misses;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    /// Returns the number of hits.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the number of misses.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Returns the number of first loads.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Returns the number of reloads.
    pub fn reloads(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }

    /// Returns the number of revalidations.
    pub fn revalidations(&self) -> u64 {
        self.revalidations.load(Ordering::Relaxed)
    }

    /// Returns the number of failed source calls.
    pub fn load_failures(&self) -> u64 {
        self.load_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of evicted entries.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

/// Records one sweeper pass.
pub(crate) fn record_sweep(failures: usize) {
    counter!("strata_sweeper_runs_total").increment(1);
    if failures > 0 {
        counter!("strata_sweeper_failures_total").increment(failures as u64);
    }
}
