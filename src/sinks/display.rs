//! Display-side sinks
//!
//! Rendering is somebody else's job. These sinks only get the entries
//! marked for display to where a renderer can reach them: either a capped
//! in-memory buffer it snapshots on its own schedule, or a channel drained
//! by the thread that owns the UI.

use crate::core::config::{SharedConfig, DEFAULT_MAX_DISPLAY_ITEMS};
use crate::core::error::{LoggerError, Result};
use crate::core::log_entry::LogEntry;
use crate::core::log_level::LogLevel;
use crate::core::sink::BatchSink;
use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// What a renderer needs to show one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayItem {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl From<&LogEntry> for DisplayItem {
    fn from(entry: &LogEntry) -> Self {
        Self {
            timestamp: *entry.timestamp(),
            level: entry.level(),
            message: entry.display_message().to_string(),
        }
    }
}

#[derive(Clone)]
enum Capacity {
    Fixed(usize),
    /// Follows `max_display_items` of a running pipeline
    Live(Arc<SharedConfig>),
}

impl Capacity {
    fn get(&self) -> usize {
        match self {
            Capacity::Fixed(max) => *max,
            Capacity::Live(config) => config.max_display_items(),
        }
    }
}

/// Newest display items, oldest dropped first once full
///
/// Clones share the same storage, so one clone can sit inside the pipeline
/// while another is handed to the renderer.
///
/// # Example
///
/// ```
/// use rust_batch_logger::sinks::DisplayBuffer;
/// use rust_batch_logger::{BatchSink, LogEntry, LogLevel};
///
/// let buffer = DisplayBuffer::new(2);
/// let mut sink = buffer.clone();
/// sink.write_batch(&[
///     LogEntry::new(LogLevel::Info, "a"),
///     LogEntry::new(LogLevel::Info, "b"),
///     LogEntry::new(LogLevel::Info, "c"),
/// ]).unwrap();
///
/// let shown: Vec<_> = buffer.snapshot().into_iter().map(|i| i.message).collect();
/// assert_eq!(shown, vec!["b", "c"]);
/// ```
#[derive(Clone)]
pub struct DisplayBuffer {
    items: Arc<Mutex<VecDeque<DisplayItem>>>,
    capacity: Capacity,
}

impl DisplayBuffer {
    /// A zero limit is raised to one.
    pub fn new(max_items: usize) -> Self {
        Self {
            items: Arc::new(Mutex::new(VecDeque::new())),
            capacity: Capacity::Fixed(max_items.max(1)),
        }
    }

    /// Buffer whose limit tracks the pipeline's live configuration
    pub fn with_config(config: Arc<SharedConfig>) -> Self {
        Self {
            items: Arc::new(Mutex::new(VecDeque::new())),
            capacity: Capacity::Live(config),
        }
    }

    pub fn max_items(&self) -> usize {
        self.capacity.get()
    }

    pub fn snapshot(&self) -> Vec<DisplayItem> {
        self.items.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }

    fn push_all(&self, entries: &[LogEntry]) {
        let max = self.capacity.get();
        let mut items = self.items.lock();
        for entry in entries {
            items.push_back(DisplayItem::from(entry));
        }
        // a lowered limit takes effect here too
        while items.len() > max {
            items.pop_front();
        }
    }
}

impl Default for DisplayBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DISPLAY_ITEMS)
    }
}

impl std::fmt::Debug for DisplayBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayBuffer")
            .field("len", &self.len())
            .field("max_items", &self.max_items())
            .finish()
    }
}

impl BatchSink for DisplayBuffer {
    fn write_batch(&mut self, entries: &[LogEntry]) -> Result<()> {
        self.push_all(entries);
        Ok(())
    }

    fn name(&self) -> &str {
        "display"
    }
}

/// Forwards each display batch to a receiver owned by another thread.
///
/// # Example
///
/// ```
/// use rust_batch_logger::sinks::ChannelDisplaySink;
/// use rust_batch_logger::{BatchSink, LogEntry, LogLevel};
///
/// let (mut sink, batches) = ChannelDisplaySink::new();
/// sink.write_batch(&[LogEntry::new(LogLevel::Warn, "low disk")]).unwrap();
///
/// let batch = batches.try_recv().unwrap();
/// assert_eq!(batch[0].message, "low disk");
/// ```
pub struct ChannelDisplaySink {
    sender: Sender<Vec<DisplayItem>>,
}

impl ChannelDisplaySink {
    pub fn new() -> (Self, Receiver<Vec<DisplayItem>>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }

    pub fn from_sender(sender: Sender<Vec<DisplayItem>>) -> Self {
        Self { sender }
    }
}

impl BatchSink for ChannelDisplaySink {
    fn write_batch(&mut self, entries: &[LogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let items = entries.iter().map(DisplayItem::from).collect();
        self.sender
            .send(items)
            .map_err(|_| LoggerError::other("display receiver disconnected"))
    }

    fn name(&self) -> &str {
        "display"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LoggerConfig;

    fn entries(messages: &[&str]) -> Vec<LogEntry> {
        messages
            .iter()
            .map(|m| LogEntry::new(LogLevel::Info, *m))
            .collect()
    }

    #[test]
    fn test_item_uses_display_text() {
        let entry = LogEntry::new(LogLevel::Error, "db timeout after 30s")
            .with_display_message("Could not reach the database");
        assert_eq!(DisplayItem::from(&entry).message, "Could not reach the database");

        let plain = LogEntry::new(LogLevel::Info, "ready");
        assert_eq!(DisplayItem::from(&plain).message, "ready");
    }

    #[test]
    fn test_buffer_keeps_newest() {
        let buffer = DisplayBuffer::new(3);
        let mut sink = buffer.clone();
        sink.write_batch(&entries(&["1", "2"])).expect("write");
        sink.write_batch(&entries(&["3", "4", "5"])).expect("write");

        let shown: Vec<_> = buffer.snapshot().into_iter().map(|i| i.message).collect();
        assert_eq!(shown, vec!["3", "4", "5"]);

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_live_limit_follows_config() {
        let config = Arc::new(SharedConfig::new(
            LoggerConfig::default().with_max_display_items(10),
        ));
        let buffer = DisplayBuffer::with_config(Arc::clone(&config));
        let mut sink = buffer.clone();
        sink.write_batch(&entries(&["a", "b", "c", "d"])).expect("write");
        assert_eq!(buffer.len(), 4);

        config.set_max_display_items(2);
        sink.write_batch(&entries(&["e"])).expect("write");
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.max_items(), 2);
    }

    #[test]
    fn test_channel_sink_reports_disconnect() {
        let (mut sink, receiver) = ChannelDisplaySink::new();
        sink.write_batch(&entries(&["x"])).expect("connected");
        assert_eq!(receiver.try_recv().expect("batch").len(), 1);

        drop(receiver);
        assert!(sink.write_batch(&entries(&["y"])).is_err());
    }
}
