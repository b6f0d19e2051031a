//! Async rolling file sink
//!
//! Same folder, naming and rollover as [`RollingFileSink`](super::RollingFileSink),
//! with the I/O done through `tokio::fs`.

use super::rolling_file::{format_batch, log_file_name, log_folder};
use crate::core::config::SharedConfig;
use crate::core::error::{LoggerError, Result};
use crate::core::log_entry::LogEntry;
use crate::core::AsyncBatchSink;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// # Example
///
/// ```no_run
/// use rust_batch_logger::core::{BlockingAsyncSink, SharedConfig};
/// use rust_batch_logger::sinks::AsyncRollingFileSink;
/// use rust_batch_logger::Logger;
/// use std::sync::Arc;
///
/// let logger = Logger::builder()
///     .log_dir("/var/log/myapp")
///     .file_sink_with(|config: Arc<SharedConfig>| {
///         Ok(Box::new(BlockingAsyncSink::new(AsyncRollingFileSink::new(config))?))
///     })
///     .build()
///     .unwrap();
/// logger.info("written through tokio::fs");
/// ```
pub struct AsyncRollingFileSink {
    config: Arc<SharedConfig>,
}

impl AsyncRollingFileSink {
    pub fn new(config: Arc<SharedConfig>) -> Self {
        Self { config }
    }

    pub async fn append_batch(
        &self,
        date: NaiveDate,
        entries: &[LogEntry],
    ) -> Result<Option<PathBuf>> {
        if entries.is_empty() {
            return Ok(None);
        }

        let folder = log_folder(&self.config.log_dir());
        fs::create_dir_all(&folder).await.map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", folder.display()),
                e,
            )
        })?;

        let path = select_log_file(&folder, date, self.config.max_file_size_bytes()).await;
        let buffer = format_batch(entries, &self.config.timestamp_format());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                LoggerError::file_sink(path.display().to_string(), format!("Failed to open: {}", e))
            })?;
        file.write_all(buffer.as_bytes()).await.map_err(|e| {
            LoggerError::file_sink(path.display().to_string(), format!("Failed to write: {}", e))
        })?;
        // tokio closes lazily; make sure the write landed before the handle goes
        file.flush().await?;

        Ok(Some(path))
    }
}

async fn select_log_file(folder: &Path, date: NaiveDate, max_bytes: u64) -> PathBuf {
    let mut sequence = 0u32;
    loop {
        let candidate = folder.join(log_file_name(date, sequence));
        let full = fs::metadata(&candidate)
            .await
            .map(|meta| meta.len() >= max_bytes)
            .unwrap_or(false);
        match sequence.checked_add(1) {
            Some(next) if full => sequence = next,
            _ => return candidate,
        }
    }
}

#[async_trait]
impl AsyncBatchSink for AsyncRollingFileSink {
    async fn write_batch(&mut self, entries: &[LogEntry]) -> Result<()> {
        self.append_batch(Local::now().date_naive(), entries)
            .await
            .map(|_| ())
    }

    fn name(&self) -> &str {
        "async_file"
    }
}
