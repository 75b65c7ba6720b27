//! Process-wide request counters.
//!
//! [`Metrics`] is created once at startup and shared as `Arc<Metrics>` by the
//! metrics and panic-recovery middleware. Every update is also mirrored to
//! the [`metrics`] facade so an exporter can be installed without touching the
//! middleware; without a recorder those calls are no-ops.
//!
//! ## Metrics Provided
//!
//! - `http_requests_total` - Requests that went through the chain
//! - `http_request_errors_total` - Requests whose inner chain returned an error
//! - `http_request_panics_total` - Handler panics caught by recovery
//! - `http_requests_active` - Requests currently in flight

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

const REQUESTS: &str = "http_requests_total";
const ERRORS: &str = "http_request_errors_total";
const PANICS: &str = "http_request_panics_total";
const ACTIVE: &str = "http_requests_active";

#[derive(Debug, Default)]
pub struct Metrics {
    requests: AtomicU64,
    errors: AtomicU64,
    panics: AtomicU64,
    active: AtomicI64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub errors: u64,
    pub panics: u64,
    pub active: i64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(REQUESTS).increment(1);
    }

    pub fn add_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(ERRORS).increment(1);
    }

    pub fn add_panic(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(PANICS).increment(1);
    }

    /// Marks a request as in flight until the returned guard is dropped.
    pub fn track_active(&self) -> ActiveGuard<'_> {
        let now = self.active.fetch_add(1, Ordering::Relaxed) + 1;
        ::metrics::gauge!(ACTIVE).set(now as f64);
        ActiveGuard { metrics: self }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
        }
    }
}

/// Decrements the active gauge on drop, including on unwind.
#[must_use]
pub struct ActiveGuard<'a> {
    metrics: &'a Metrics,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let now = self.metrics.active.fetch_sub(1, Ordering::Relaxed) - 1;
        ::metrics::gauge!(ACTIVE).set(now as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let m = Metrics::new();
        m.add_request();
        m.add_request();
        m.add_error();
        m.add_panic();

        assert_eq!(
            m.snapshot(),
            MetricsSnapshot {
                requests: 2,
                errors: 1,
                panics: 1,
                active: 0,
            }
        );
    }

    #[test]
    fn test_active_guard() {
        let m = Metrics::new();
        {
            let _a = m.track_active();
            let _b = m.track_active();
            assert_eq!(m.snapshot().active, 2);
        }
        assert_eq!(m.snapshot().active, 0);
    }
}
