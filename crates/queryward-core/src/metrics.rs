//! Counters for gateway verdicts.
//!
//! A `GateMetrics` can be shared between gateways (and threads) behind an
//! `Arc`; reading it never blocks validation.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals for every response seen by a gateway.
#[derive(Debug, Default)]
pub struct GateMetrics {
    received: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    decode_failures: AtomicU64,
    violations: AtomicU64,
    warnings: AtomicU64,
}

impl GateMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::SeqCst);
    }

    /// Record an accepted response and the warnings it carried.
    pub fn record_accepted(&self, warnings: usize) {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        self.warnings.fetch_add(warnings as u64, Ordering::SeqCst);
    }

    /// Record a rejection after decoding succeeded.
    pub fn record_rejected(&self, violations: usize, warnings: usize) {
        self.rejected.fetch_add(1, Ordering::SeqCst);
        self.violations.fetch_add(violations as u64, Ordering::SeqCst);
        self.warnings.fetch_add(warnings as u64, Ordering::SeqCst);
    }

    /// Record output that never became a JSON document.
    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::SeqCst);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received.load(Ordering::SeqCst),
            accepted: self.accepted.load(Ordering::SeqCst),
            rejected: self.rejected.load(Ordering::SeqCst),
            decode_failures: self.decode_failures.load(Ordering::SeqCst),
            violations: self.violations.load(Ordering::SeqCst),
            warnings: self.warnings.load(Ordering::SeqCst),
        }
    }
}

/// Serializable view of `GateMetrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub decode_failures: u64,

    /// Total violations across all rejections
    pub violations: u64,

    /// Total warnings across all verdicts
    pub warnings: u64,
}

impl MetricsSnapshot {
    /// Share of received responses that were accepted.
    pub fn acceptance_rate(&self) -> f64 {
        if self.received == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.received as f64
    }
}
