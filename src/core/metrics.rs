//! Pipeline metrics for observability
//!
//! Counters for queue admission, dispatch throughput and sink health.
//! The live queue depth is read from the queue itself
//! ([`Logger::queue_depth`](crate::Logger::queue_depth)).

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for pipeline observability
///
/// # Example
///
/// ```
/// use rust_batch_logger::PipelineMetrics;
///
/// let metrics = PipelineMetrics::new();
/// metrics.record_enqueued();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.enqueued(), 1);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct PipelineMetrics {
    /// Entries accepted into the queue
    enqueued: AtomicU64,

    /// Entries lost to a full bounded queue
    dropped_count: AtomicU64,

    /// Entries skipped at admission because no queued sink wanted them
    unrouted_skipped: AtomicU64,

    /// Dispatcher cycles that moved at least one entry
    batches_dispatched: AtomicU64,

    /// Entries handed out by the dispatcher or a flush
    entries_dispatched: AtomicU64,

    /// Sink calls that returned an error
    sink_failures: AtomicU64,

    /// Sink calls that panicked
    sink_panics: AtomicU64,

    /// Dispatcher cycles that panicked outside the sink boundary
    dispatcher_panics: AtomicU64,
}

impl PipelineMetrics {
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            unrouted_skipped: AtomicU64::new(0),
            batches_dispatched: AtomicU64::new(0),
            entries_dispatched: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            sink_panics: AtomicU64::new(0),
            dispatcher_panics: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn unrouted_skipped(&self) -> u64 {
        self.unrouted_skipped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn batches_dispatched(&self) -> u64 {
        self.batches_dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn entries_dispatched(&self) -> u64 {
        self.entries_dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_panics(&self) -> u64 {
        self.sink_panics.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dispatcher_panics(&self) -> u64 {
        self.dispatcher_panics.load(Ordering::Relaxed)
    }

    /// Record an accepted entry; returns the previous count
    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.enqueued.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a dropped entry; returns the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_unrouted(&self) -> u64 {
        self.unrouted_skipped.fetch_add(1, Ordering::Relaxed)
    }

    /// Record one dispatched batch of `entries` entries
    #[inline]
    pub fn record_batch(&self, entries: usize) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
        self.entries_dispatched
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_panic(&self) -> u64 {
        self.sink_panics.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dispatcher_panic(&self) -> u64 {
        self.dispatcher_panics.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been offered to the queue.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.enqueued() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.enqueued.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.unrouted_skipped.store(0, Ordering::Relaxed);
        self.batches_dispatched.store(0, Ordering::Relaxed);
        self.entries_dispatched.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
        self.sink_panics.store(0, Ordering::Relaxed);
        self.dispatcher_panics.store(0, Ordering::Relaxed);
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PipelineMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            enqueued: AtomicU64::new(self.enqueued()),
            dropped_count: AtomicU64::new(self.dropped_count()),
            unrouted_skipped: AtomicU64::new(self.unrouted_skipped()),
            batches_dispatched: AtomicU64::new(self.batches_dispatched()),
            entries_dispatched: AtomicU64::new(self.entries_dispatched()),
            sink_failures: AtomicU64::new(self.sink_failures()),
            sink_panics: AtomicU64::new(self.sink_panics()),
            dispatcher_panics: AtomicU64::new(self.dispatcher_panics()),
        }
    }
}
