//! Collector configuration

use std::collections::BTreeSet;
use std::time::Duration;

/// Tunables for one collection run
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Worker pool size: max (service, region) units in flight
    pub max_workers: usize,
    /// Pagination cap per operation; reaching it truncates, not fails
    pub max_pages: usize,
    /// Fan-out cap for inferred-parameter follow-up calls per list result
    pub max_followups: usize,
    /// Attempt bound for transient failures (first try included)
    pub max_attempts: u32,
    /// Base delay for exponential backoff with full jitter
    pub base_backoff: Duration,
    /// Per-call timeout; exceeding it counts as a transient failure
    pub call_timeout: Duration,
    /// Remote calls per second across the whole run, independent of
    /// worker count. None disables throttling.
    pub rate_limit: Option<f64>,
    /// If set, only these services are collected
    pub service_allowlist: Option<BTreeSet<String>>,
    /// Services never collected
    pub service_denylist: BTreeSet<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_workers: 8,
            max_pages: 100,
            max_followups: 5,
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
            call_timeout: Duration::from_secs(30),
            rate_limit: None,
            service_allowlist: None,
            service_denylist: BTreeSet::new(),
        }
    }
}

impl CollectorConfig {
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_max_followups(mut self, max_followups: usize) -> Self {
        self.max_followups = max_followups;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_rate_limit(mut self, calls_per_second: f64) -> Self {
        self.rate_limit = Some(calls_per_second);
        self
    }

    pub fn with_allowlist<I: IntoIterator<Item = String>>(mut self, services: I) -> Self {
        self.service_allowlist = Some(services.into_iter().collect());
        self
    }

    pub fn with_denylist<I: IntoIterator<Item = String>>(mut self, services: I) -> Self {
        self.service_denylist = services.into_iter().collect();
        self
    }

    /// Whether a service participates in this run
    pub fn should_collect(&self, service: &str) -> bool {
        if self.service_denylist.contains(service) {
            return false;
        }
        match &self.service_allowlist {
            Some(allow) => allow.contains(service),
            None => true,
        }
    }
}
