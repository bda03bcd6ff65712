//! Injected metrics sink
//!
//! The engine reports through a trait so the core stays free of process-wide
//! statics and unit tests can observe or ignore the counters. Implementations
//! must not influence matching: the counters are side-channel observability,
//! outside the deterministic state.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hooks the engine calls while processing commands
pub trait MetricsSink {
    /// A command was consumed (new order or cancel)
    fn on_order_processed(&self);
    /// A REJECTED report was emitted
    fn on_order_rejected(&self);
    /// A fill report (full or partial) was emitted
    fn on_match_found(&self);
    /// Caller-measured processing latency
    fn on_latency(&self, nanos: u64);
}

/// Relaxed atomic counters, cheap enough for the hot path
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    orders_processed: AtomicU64,
    orders_rejected: AtomicU64,
    matches_found: AtomicU64,
    latency_total_ns: AtomicU64,
    latency_samples: AtomicU64,
}

impl AtomicMetrics {
    /// Fresh zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total commands processed
    #[must_use]
    pub fn orders_processed(&self) -> u64 {
        self.orders_processed.load(Ordering::Relaxed)
    }

    /// Total REJECTED reports emitted
    #[must_use]
    pub fn orders_rejected(&self) -> u64 {
        self.orders_rejected.load(Ordering::Relaxed)
    }

    /// Total fill reports emitted
    #[must_use]
    pub fn matches_found(&self) -> u64 {
        self.matches_found.load(Ordering::Relaxed)
    }

    /// Mean recorded latency in nanoseconds, zero before any sample
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_latency_ns(&self) -> f64 {
        let samples = self.latency_samples.load(Ordering::Relaxed);
        if samples == 0 {
            return 0.0;
        }
        self.latency_total_ns.load(Ordering::Relaxed) as f64 / samples as f64
    }

    /// Zero all counters
    pub fn reset(&self) {
        self.orders_processed.store(0, Ordering::Relaxed);
        self.orders_rejected.store(0, Ordering::Relaxed);
        self.matches_found.store(0, Ordering::Relaxed);
        self.latency_total_ns.store(0, Ordering::Relaxed);
        self.latency_samples.store(0, Ordering::Relaxed);
    }
}

impl MetricsSink for AtomicMetrics {
    #[inline]
    fn on_order_processed(&self) {
        self.orders_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn on_order_rejected(&self) {
        self.orders_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn on_match_found(&self) {
        self.matches_found.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn on_latency(&self, nanos: u64) {
        self.latency_total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }
}

/// Discards every observation
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMetrics;

impl MetricsSink for NoOpMetrics {
    #[inline]
    fn on_order_processed(&self) {}
    #[inline]
    fn on_order_rejected(&self) {}
    #[inline]
    fn on_match_found(&self) {}
    #[inline]
    fn on_latency(&self, _nanos: u64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = AtomicMetrics::new();
        metrics.on_order_processed();
        metrics.on_order_processed();
        metrics.on_match_found();
        metrics.on_order_rejected();
        metrics.on_latency(100);
        metrics.on_latency(300);

        assert_eq!(metrics.orders_processed(), 2);
        assert_eq!(metrics.matches_found(), 1);
        assert_eq!(metrics.orders_rejected(), 1);
        assert!((metrics.average_latency_ns() - 200.0).abs() < f64::EPSILON);

        metrics.reset();
        assert_eq!(metrics.orders_processed(), 0);
        assert!((metrics.average_latency_ns()).abs() < f64::EPSILON);
    }
}
