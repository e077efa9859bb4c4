use resource_kit::observability::CacheMetrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters for cache operations, rendered in Prometheus text format.
#[derive(Clone)]
pub struct PrometheusMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    fills: Arc<AtomicU64>,
    evictions: Arc<AtomicU64>,
    evicted_entries: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
    latency_total_us: Arc<AtomicU64>,
    latency_count: Arc<AtomicU64>,
}

impl CacheMetrics for PrometheusMetrics {
    fn record_hit(&self, _key: &str, duration: Duration) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.observe(duration);
    }

    fn record_miss(&self, _key: &str, duration: Duration) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.observe(duration);
    }

    fn record_set(&self, _key: &str, duration: Duration) {
        self.fills.fetch_add(1, Ordering::Relaxed);
        self.observe(duration);
    }

    fn record_evict(&self, _tag: &str, removed: usize, duration: Duration) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
        self.evicted_entries
            .fetch_add(removed as u64, Ordering::Relaxed);
        self.observe(duration);
    }

    fn record_error(&self, _key: &str, _error: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

impl PrometheusMetrics {
    pub fn new() -> Self {
        PrometheusMetrics {
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            fills: Arc::new(AtomicU64::new(0)),
            evictions: Arc::new(AtomicU64::new(0)),
            evicted_entries: Arc::new(AtomicU64::new(0)),
            errors: Arc::new(AtomicU64::new(0)),
            latency_total_us: Arc::new(AtomicU64::new(0)),
            latency_count: Arc::new(AtomicU64::new(0)),
        }
    }

    fn observe(&self, duration: Duration) {
        self.latency_total_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        if (hits + misses) == 0.0 {
            return 0.0;
        }
        hits / (hits + misses)
    }

    /// Average latency in microseconds
    pub fn avg_latency_us(&self) -> f64 {
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        self.latency_total_us.load(Ordering::Relaxed) as f64 / count as f64
    }

    pub fn render_prometheus(&self) -> String {
        format!(
            r#"# HELP cache_hits_total Total cache hits
# TYPE cache_hits_total counter
cache_hits_total {}

# HELP cache_misses_total Total cache misses
# TYPE cache_misses_total counter
cache_misses_total {}

# HELP cache_fills_total Total cache fills after a store read
# TYPE cache_fills_total counter
cache_fills_total {}

# HELP cache_evictions_total Total tag evictions
# TYPE cache_evictions_total counter
cache_evictions_total {}

# HELP cache_evicted_entries_total Entries removed by tag evictions
# TYPE cache_evicted_entries_total counter
cache_evicted_entries_total {}

# HELP cache_errors_total Total cache-side errors
# TYPE cache_errors_total counter
cache_errors_total {}

# HELP cache_hit_rate Cache hit rate (0.0-1.0)
# TYPE cache_hit_rate gauge
cache_hit_rate {:.4}

# HELP cache_avg_latency_us Average cache latency in microseconds
# TYPE cache_avg_latency_us gauge
cache_avg_latency_us {:.2}
"#,
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.fills.load(Ordering::Relaxed),
            self.evictions.load(Ordering::Relaxed),
            self.evicted_entries.load(Ordering::Relaxed),
            self.errors.load(Ordering::Relaxed),
            self.hit_rate(),
            self.avg_latency_us(),
        )
    }
}

impl Default for PrometheusMetrics {
    fn default() -> Self {
        Self::new()
    }
}
