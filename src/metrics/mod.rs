//! Queue Metrics Module
//!
//! Optional operation counters for [`MpscQueue`](crate::MpscQueue). Counting is compiled in
//! with the `metrics` feature (on by default) and can be switched off at runtime through
//! [`MetricsCollector::set_metrics_enabled`]. Without the feature, [`AtomicMetrics`] is a
//! zero-sized no-op and every snapshot is all zeroes.
//!
//! Counters use `Relaxed` ordering: they are statistics, not synchronization, and a
//! snapshot taken while producers are running is only approximately consistent.
//!
//! The producer-written counter, the consumer-written counters and the enable flag each
//! sit on their own cache line, and none of them shares a line with the queue's `head` or
//! `tail`.

#[cfg(feature = "metrics")]
use crate::util::CachePadded;
#[cfg(feature = "metrics")]
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A point-in-time snapshot of a queue's counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueMetrics {
    /// Number of elements enqueued
    pub enqueued: u64,
    /// Number of elements handed to the consumer
    pub dequeued: u64,
    /// Number of dequeue attempts that found the queue empty
    pub empty_polls: u64,
}

impl QueueMetrics {
    /// Elements enqueued but not yet dequeued at the time of the snapshot
    pub fn backlog(&self) -> u64 {
        self.enqueued.saturating_sub(self.dequeued)
    }

    /// Percentage of dequeue attempts that returned an element
    pub fn hit_rate(&self) -> f64 {
        let attempts = self.dequeued + self.empty_polls;
        if attempts == 0 {
            0.0
        } else {
            (self.dequeued as f64 / attempts as f64) * 100.0
        }
    }
}

/// Internal atomic counters backing [`QueueMetrics`]
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct AtomicMetrics {
    // Written by every producer
    enqueued: CachePadded<AtomicU64>,

    // Written only by the consumer
    consumer: CachePadded<ConsumerCounters>,

    // Read on every operation, written only by `set_enabled`
    enabled: CachePadded<AtomicBool>,
}

#[cfg(feature = "metrics")]
#[derive(Debug)]
struct ConsumerCounters {
    dequeued: AtomicU64,
    empty_polls: AtomicU64,
}

#[cfg(feature = "metrics")]
impl Default for AtomicMetrics {
    fn default() -> Self {
        Self {
            enqueued: CachePadded::new(AtomicU64::new(0)),
            consumer: CachePadded::new(ConsumerCounters {
                dequeued: AtomicU64::new(0),
                empty_polls: AtomicU64::new(0),
            }),
            enabled: CachePadded::new(AtomicBool::new(true)),
        }
    }
}

#[cfg(feature = "metrics")]
impl AtomicMetrics {
    /// Record one successful enqueue
    #[inline]
    pub fn record_enqueue(&self) {
        if self.is_enabled() {
            self.enqueued.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record one successful dequeue
    #[inline]
    pub fn record_dequeue(&self) {
        if self.is_enabled() {
            self.consumer.dequeued.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a dequeue attempt that found nothing
    #[inline]
    pub fn record_empty_poll(&self) {
        if self.is_enabled() {
            self.consumer.empty_polls.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> QueueMetrics {
        QueueMetrics {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dequeued: self.consumer.dequeued.load(Ordering::Relaxed),
            empty_polls: self.consumer.empty_polls.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.enqueued.store(0, Ordering::Relaxed);
        self.consumer.dequeued.store(0, Ordering::Relaxed);
        self.consumer.empty_polls.store(0, Ordering::Relaxed);
    }

    /// Turn counting on or off
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Whether counting is on
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

/// No-op counters used when the `metrics` feature is disabled
#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct AtomicMetrics;

#[cfg(not(feature = "metrics"))]
#[allow(missing_docs)]
impl AtomicMetrics {
    #[inline]
    pub fn record_enqueue(&self) {}
    #[inline]
    pub fn record_dequeue(&self) {}
    #[inline]
    pub fn record_empty_poll(&self) {}
    pub fn snapshot(&self) -> QueueMetrics {
        QueueMetrics::default()
    }
    pub fn reset(&self) {}
    pub fn set_enabled(&self, _enabled: bool) {}
    pub fn is_enabled(&self) -> bool {
        false
    }
}

/// Trait for data structures that expose [`QueueMetrics`]
pub trait MetricsCollector {
    /// Get current metrics
    fn metrics(&self) -> QueueMetrics;

    /// Reset all counters
    fn reset_metrics(&self);

    /// Enable or disable metrics collection
    fn set_metrics_enabled(&self, enabled: bool);

    /// Check if metrics collection is enabled
    fn is_metrics_enabled(&self) -> bool;
}
