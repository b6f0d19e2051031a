//! Batch sink trait for queued log destinations
//!
//! The file and display sinks sit behind this trait. Each one runs on its
//! own lane thread, so implementations may block on I/O or on another
//! thread without holding up the dispatcher or each other.

use super::{error::Result, log_entry::LogEntry};

pub trait BatchSink: Send {
    /// Consume one batch, in queue order
    fn write_batch(&mut self, entries: &[LogEntry]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

impl<S: BatchSink + ?Sized> BatchSink for Box<S> {
    fn write_batch(&mut self, entries: &[LogEntry]) -> Result<()> {
        (**self).write_batch(entries)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
