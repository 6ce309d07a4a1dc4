use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    search_requests: AtomicU64,
    icon_cache_hits: AtomicU64,
    icon_cache_misses: AtomicU64,
    icon_downloads: AtomicU64,
    icon_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub search_requests: u64,
    pub icon_cache_hits: u64,
    pub icon_cache_misses: u64,
    pub icon_downloads: u64,
    pub icon_failures: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_search_request(&self) {
        self.search_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_icon_cache_hit(&self) {
        self.icon_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_icon_cache_miss(&self) {
        self.icon_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_icon_download(&self) {
        self.icon_downloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_icon_failure(&self) {
        self.icon_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            search_requests: self.search_requests.load(Ordering::Relaxed),
            icon_cache_hits: self.icon_cache_hits.load(Ordering::Relaxed),
            icon_cache_misses: self.icon_cache_misses.load(Ordering::Relaxed),
            icon_downloads: self.icon_downloads.load(Ordering::Relaxed),
            icon_failures: self.icon_failures.load(Ordering::Relaxed),
        }
    }
}

/// Emits the run's counters at debug level.
pub fn log_summary(metrics: &Metrics) {
    let s = metrics.snapshot();
    tracing::debug!(
        search_requests = s.search_requests,
        icon_cache_hit = s.icon_cache_hits,
        icon_cache_miss = s.icon_cache_misses,
        icon_downloads = s.icon_downloads,
        icon_failures = s.icon_failures,
        "metrics"
    );
}
