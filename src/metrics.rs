use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Operational counters for monitoring
#[derive(Clone)]
pub struct Metrics {
    pub sign_ins: Arc<AtomicUsize>,
    pub auth_failures: Arc<AtomicUsize>,
    pub shares_created: Arc<AtomicUsize>,
    pub shares_removed: Arc<AtomicUsize>,
    pub shares_expired: Arc<AtomicUsize>,
    pub sweep_runs: Arc<AtomicUsize>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sign_ins: Arc::new(AtomicUsize::new(0)),
            auth_failures: Arc::new(AtomicUsize::new(0)),
            shares_created: Arc::new(AtomicUsize::new(0)),
            shares_removed: Arc::new(AtomicUsize::new(0)),
            shares_expired: Arc::new(AtomicUsize::new(0)),
            sweep_runs: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_sign_ins(&self) {
        self.sign_ins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_auth_failures(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_shares_created(&self) {
        self.shares_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_shares_removed(&self) {
        self.shares_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_shares_expired(&self, count: usize) {
        self.shares_expired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_sweep_runs(&self) {
        self.sweep_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sign_ins: self.sign_ins.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            shares_created: self.shares_created.load(Ordering::Relaxed),
            shares_removed: self.shares_removed.load(Ordering::Relaxed),
            shares_expired: self.shares_expired.load(Ordering::Relaxed),
            sweep_runs: self.sweep_runs.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub sign_ins: usize,
    pub auth_failures: usize,
    pub shares_created: usize,
    pub shares_removed: usize,
    pub shares_expired: usize,
    pub sweep_runs: usize,
    pub uptime_seconds: u64,
}
