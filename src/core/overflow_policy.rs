//! Overflow policies for the bounded ingest queue
//!
//! The queue is unbounded unless the integrator sets a capacity. With a
//! capacity, one of these policies decides which entry is lost when the
//! queue is full. Producers are never blocked either way.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Policy for handling a full bounded queue
///
/// # Example
///
/// ```
/// use rust_batch_logger::OverflowPolicy;
///
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::DropOldest);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Evict the oldest queued entry to make room for the new one
    ///
    /// Keeps the most recent history, which is usually what matters when a
    /// consumer has stalled.
    #[default]
    DropOldest,

    /// Reject the new entry and keep the queue as it is
    DropNewest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
        }
    }
}

/// Callback type for overflow notifications
///
/// Called when entries are dropped because the bounded queue is full.
/// The parameter is the total count of dropped entries so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;
