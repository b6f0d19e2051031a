//! Multi-producer FIFO of pending entries
//!
//! A `VecDeque` behind a short-held mutex. The lock is also what linearizes
//! concurrent producers: entries leave in exactly the order `enqueue`
//! acquired it. The depth gauge is mirrored into an atomic so the dispatcher
//! and metrics readers never touch the lock just to look at the size.

use super::log_entry::LogEntry;
use super::metrics::PipelineMetrics;
use super::overflow_policy::{OverflowCallback, OverflowPolicy};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// What happened to an offered entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Accepted,
    /// Accepted after evicting the oldest queued entry
    EvictedOldest,
    /// Not queued; the bounded queue was full
    Rejected,
}

pub struct IngestQueue {
    entries: Mutex<VecDeque<LogEntry>>,
    depth: AtomicUsize,
    capacity: Option<usize>,
    policy: OverflowPolicy,
    metrics: Arc<PipelineMetrics>,
    on_overflow: Option<OverflowCallback>,
}

impl IngestQueue {
    /// Unbounded queue; `enqueue` always accepts.
    pub fn unbounded(metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            depth: AtomicUsize::new(0),
            capacity: None,
            policy: OverflowPolicy::default(),
            metrics,
            on_overflow: None,
        }
    }

    /// Bounded queue; a zero capacity is raised to one.
    pub fn bounded(
        capacity: usize,
        policy: OverflowPolicy,
        metrics: Arc<PipelineMetrics>,
        on_overflow: Option<OverflowCallback>,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            depth: AtomicUsize::new(0),
            capacity: Some(capacity),
            policy,
            metrics,
            on_overflow,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn enqueue(&self, entry: LogEntry) -> EnqueueOutcome {
        let outcome = {
            let mut entries = self.entries.lock();
            let outcome = match self.capacity {
                Some(capacity) if entries.len() >= capacity => match self.policy {
                    OverflowPolicy::DropOldest => {
                        entries.pop_front();
                        entries.push_back(entry);
                        EnqueueOutcome::EvictedOldest
                    }
                    OverflowPolicy::DropNewest => EnqueueOutcome::Rejected,
                },
                _ => {
                    entries.push_back(entry);
                    EnqueueOutcome::Accepted
                }
            };
            self.depth.store(entries.len(), Ordering::Release);
            outcome
        };

        match outcome {
            EnqueueOutcome::Accepted => {
                self.metrics.record_enqueued();
            }
            EnqueueOutcome::EvictedOldest => {
                self.metrics.record_enqueued();
                self.alert_dropped();
            }
            EnqueueOutcome::Rejected => self.alert_dropped(),
        }
        outcome
    }

    /// Count a drop; alert on the first one and on every 1000th after it.
    fn alert_dropped(&self) {
        let dropped_count = self.metrics.record_dropped();
        let should_alert = dropped_count == 0 || (dropped_count + 1) % 1000 == 0;

        if should_alert {
            eprintln!(
                "[LOGGER WARNING] Ingest queue full ({} policy), {} entries dropped. \
                 Consider a larger capacity or a faster sink.",
                self.policy,
                dropped_count + 1
            );

            if let Some(ref callback) = self.on_overflow {
                callback(dropped_count + 1);
            }
        }
    }

    pub fn try_dequeue(&self) -> Option<LogEntry> {
        let mut entries = self.entries.lock();
        let entry = entries.pop_front();
        self.depth.store(entries.len(), Ordering::Release);
        entry
    }

    /// Copy of the head entry, leaving the queue untouched
    pub fn try_peek(&self) -> Option<LogEntry> {
        self.entries.lock().front().cloned()
    }

    /// Dequeue up to `max` entries in FIFO order under a single lock.
    pub fn drain(&self, max: usize) -> Vec<LogEntry> {
        let mut entries = self.entries.lock();
        let count = max.min(entries.len());
        let batch: Vec<LogEntry> = entries.drain(..count).collect();
        self.depth.store(entries.len(), Ordering::Release);
        batch
    }

    /// Swap out the whole queue in one step.
    pub fn take_all(&self) -> Vec<LogEntry> {
        let mut entries = self.entries.lock();
        let taken = std::mem::take(&mut *entries);
        self.depth.store(0, Ordering::Release);
        taken.into()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for IngestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestQueue")
            .field("depth", &self.len())
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .finish()
    }
}
