//! Async batch sinks
//!
//! Lanes are plain threads, so an async sink is driven through
//! [`BlockingAsyncSink`], which gives it a private current-thread runtime
//! and blocks on each call.

use super::error::{LoggerError, Result};
use super::log_entry::LogEntry;
use super::sink::BatchSink;
use async_trait::async_trait;
use tokio::runtime::{Builder, Runtime};

/// Trait for asynchronous batch sinks
///
/// # Example
///
/// ```no_run
/// use rust_batch_logger::core::{AsyncBatchSink, LogEntry, Result};
/// use async_trait::async_trait;
///
/// struct Uploader;
///
/// #[async_trait]
/// impl AsyncBatchSink for Uploader {
///     async fn write_batch(&mut self, entries: &[LogEntry]) -> Result<()> {
///         // ship the batch somewhere
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "uploader"
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncBatchSink: Send {
    async fn write_batch(&mut self, entries: &[LogEntry]) -> Result<()>;

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Runs an [`AsyncBatchSink`] as a regular [`BatchSink`].
///
/// Must not be called from inside another tokio runtime; the lane thread
/// that owns it never is.
pub struct BlockingAsyncSink<S> {
    inner: S,
    runtime: Runtime,
}

impl<S: AsyncBatchSink> BlockingAsyncSink<S> {
    pub fn new(inner: S) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                LoggerError::io_operation(
                    "start async sink runtime",
                    format!("Failed to build runtime for '{}'", inner.name()),
                    e,
                )
            })?;
        Ok(Self { inner, runtime })
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: AsyncBatchSink> BatchSink for BlockingAsyncSink<S> {
    fn write_batch(&mut self, entries: &[LogEntry]) -> Result<()> {
        let Self { inner, runtime } = self;
        runtime.block_on(inner.write_batch(entries))
    }

    fn flush(&mut self) -> Result<()> {
        let Self { inner, runtime } = self;
        runtime.block_on(inner.flush())
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
