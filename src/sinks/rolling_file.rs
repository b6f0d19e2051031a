//! Date-named log files with size-based rollover
//!
//! Files live in `{log_dir}/Log/` and are named `Log_YYYY_MM_DD.log`, then
//! `Log_YYYY_MM_DD_1.log`, `Log_YYYY_MM_DD_2.log` and so on once a file
//! reaches the configured size. The target file is chosen again for every
//! batch and no handle is kept between batches, so files moved or deleted
//! underneath the sink are picked up on the next write.

use crate::core::config::SharedConfig;
use crate::core::error::{LoggerError, Result};
use crate::core::log_entry::LogEntry;
use crate::core::sink::BatchSink;
use crate::core::timestamp::TimestampFormat;
use chrono::{Local, NaiveDate};
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "file")]
use fs2::FileExt;

/// Subdirectory of the configured log directory that holds the files
pub const LOG_SUBDIR: &str = "Log";

pub fn log_folder(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_SUBDIR)
}

/// `Log_2025_01_08.log` for sequence 0, `Log_2025_01_08_3.log` for 3
pub fn log_file_name(date: NaiveDate, sequence: u32) -> String {
    let stem = format!("Log_{}", date.format("%Y_%m_%d"));
    if sequence == 0 {
        format!("{}.log", stem)
    } else {
        format!("{}_{}.log", stem, sequence)
    }
}

/// First file for `date`, in ascending suffix order, that is missing or
/// still below `max_bytes`.
pub fn select_log_file(folder: &Path, date: NaiveDate, max_bytes: u64) -> PathBuf {
    let mut sequence = 0u32;
    loop {
        let candidate = folder.join(log_file_name(date, sequence));
        let full = fs::metadata(&candidate)
            .map(|meta| meta.len() >= max_bytes)
            .unwrap_or(false);
        match sequence.checked_add(1) {
            Some(next) if full => sequence = next,
            _ => return candidate,
        }
    }
}

/// One line per entry: `{timestamp}: {LEVEL} {message}\n`
pub fn format_batch(entries: &[LogEntry], format: &TimestampFormat) -> String {
    let estimate: usize = entries.iter().map(|e| e.raw_message().len() + 32).sum();
    let mut buffer = String::with_capacity(estimate);
    for entry in entries {
        let _ = writeln!(
            buffer,
            "{}: {} {}",
            format.format(entry.timestamp()),
            entry.level().to_str(),
            entry.raw_message()
        );
    }
    buffer
}

/// File sink driven by the pipeline's live configuration
///
/// # Example
///
/// ```no_run
/// use rust_batch_logger::{LogEntry, LogLevel, LoggerConfig, SharedConfig};
/// use rust_batch_logger::sinks::RollingFileSink;
/// use std::sync::Arc;
///
/// let config = Arc::new(SharedConfig::new(
///     LoggerConfig::default().with_log_dir("/var/log/myapp"),
/// ));
/// let sink = RollingFileSink::new(config);
/// let written = sink
///     .append_batch(chrono::Local::now().date_naive(), &[LogEntry::new(LogLevel::Info, "started")])
///     .unwrap();
/// println!("wrote {:?}", written);
/// ```
pub struct RollingFileSink {
    config: Arc<SharedConfig>,
}

impl RollingFileSink {
    pub fn new(config: Arc<SharedConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Arc<SharedConfig> {
        &self.config
    }

    /// Append `entries` to the file selected for `date` and return its path.
    ///
    /// The folder is created if needed and the whole batch goes out in a
    /// single write. Returns `Ok(None)` for an empty batch.
    pub fn append_batch(&self, date: NaiveDate, entries: &[LogEntry]) -> Result<Option<PathBuf>> {
        if entries.is_empty() {
            return Ok(None);
        }

        let folder = log_folder(&self.config.log_dir());
        fs::create_dir_all(&folder).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", folder.display()),
                e,
            )
        })?;

        let path = select_log_file(&folder, date, self.config.max_file_size_bytes());
        let buffer = format_batch(entries, &self.config.timestamp_format());
        append_to(&path, buffer.as_bytes())?;
        Ok(Some(path))
    }
}

fn append_to(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            LoggerError::file_sink(path.display().to_string(), format!("Failed to open: {}", e))
        })?;

    // Released when the handle is closed
    #[cfg(feature = "file")]
    file.lock_exclusive().map_err(|e| {
        LoggerError::file_sink(path.display().to_string(), format!("Failed to lock: {}", e))
    })?;

    file.write_all(bytes).map_err(|e| {
        LoggerError::file_sink(path.display().to_string(), format!("Failed to write: {}", e))
    })
}

impl BatchSink for RollingFileSink {
    fn write_batch(&mut self, entries: &[LogEntry]) -> Result<()> {
        self.append_batch(Local::now().date_naive(), entries)
            .map(|_| ())
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LoggerConfig;
    use crate::core::log_level::LogLevel;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 8).expect("valid date")
    }

    fn sink_in(dir: &TempDir, max_bytes: i64) -> RollingFileSink {
        RollingFileSink::new(Arc::new(SharedConfig::new(
            LoggerConfig::default()
                .with_log_dir(dir.path())
                .with_max_file_size_bytes(max_bytes),
        )))
    }

    fn entry(message: &str) -> LogEntry {
        let at = Local
            .with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("unambiguous local time");
        LogEntry::new(LogLevel::Warn, message).with_timestamp(at)
    }

    #[test]
    fn test_file_names() {
        assert_eq!(log_file_name(date(), 0), "Log_2025_01_08.log");
        assert_eq!(log_file_name(date(), 2), "Log_2025_01_08_2.log");
        assert_eq!(
            log_folder(Path::new("/var/app")),
            PathBuf::from("/var/app/Log")
        );
    }

    #[test]
    fn test_format_batch() {
        let text = format_batch(&[entry("disk low"), entry("retry")], &TimestampFormat::Standard);
        assert_eq!(
            text,
            "2025-01-08 10:30:45: WARN disk low\n2025-01-08 10:30:45: WARN retry\n"
        );
    }

    #[test]
    fn test_format_batch_with_unparseable_pattern() {
        let format = TimestampFormat::Custom("%Q".to_string());
        assert_eq!(
            format_batch(&[entry("disk low")], &format),
            "2025-01-08 10:30:45: WARN disk low\n"
        );
    }

    #[test]
    fn test_select_skips_full_files() {
        let dir = TempDir::new().expect("temp dir");
        let folder = dir.path();

        assert_eq!(
            select_log_file(folder, date(), 10),
            folder.join("Log_2025_01_08.log")
        );

        fs::write(folder.join("Log_2025_01_08.log"), "0123456789").expect("seed");
        fs::write(folder.join("Log_2025_01_08_1.log"), "0123456789abc").expect("seed");
        fs::write(folder.join("Log_2025_01_08_2.log"), "short").expect("seed");

        assert_eq!(
            select_log_file(folder, date(), 10),
            folder.join("Log_2025_01_08_2.log")
        );
    }

    #[test]
    fn test_append_creates_folder_and_appends() {
        let dir = TempDir::new().expect("temp dir");
        let sink = sink_in(&dir, 1024 * 1024);

        let first = sink
            .append_batch(date(), &[entry("one")])
            .expect("write")
            .expect("path");
        let second = sink
            .append_batch(date(), &[entry("two")])
            .expect("write")
            .expect("path");

        assert_eq!(first, dir.path().join("Log").join("Log_2025_01_08.log"));
        assert_eq!(first, second);
        let content = fs::read_to_string(&first).expect("read");
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with("WARN two\n"));
    }

    #[test]
    fn test_small_limit_rolls_over_after_one_batch() {
        let dir = TempDir::new().expect("temp dir");
        let sink = sink_in(&dir, 16);

        let batch = [entry("first batch line"), entry("another line")];
        let first = sink.append_batch(date(), &batch).expect("write");
        let second = sink.append_batch(date(), &batch).expect("write");

        let folder = dir.path().join("Log");
        assert_eq!(first, Some(folder.join("Log_2025_01_08.log")));
        assert_eq!(second, Some(folder.join("Log_2025_01_08_1.log")));

        let one_batch = format_batch(&batch, &TimestampFormat::Standard).len() as u64;
        let size = fs::metadata(folder.join("Log_2025_01_08.log"))
            .expect("metadata")
            .len();
        assert_eq!(size, one_batch);
    }

    #[test]
    fn test_empty_batch_touches_nothing() {
        let dir = TempDir::new().expect("temp dir");
        let sink = sink_in(&dir, 1024);
        assert_eq!(sink.append_batch(date(), &[]).expect("noop"), None);
        assert!(!dir.path().join("Log").exists());
    }

    #[test]
    fn test_log_dir_change_applies_to_next_batch() {
        let first_dir = TempDir::new().expect("temp dir");
        let second_dir = TempDir::new().expect("temp dir");
        let sink = sink_in(&first_dir, 1024);

        sink.append_batch(date(), &[entry("a")]).expect("write");
        sink.config().set_log_dir(second_dir.path());
        let path = sink
            .append_batch(date(), &[entry("b")])
            .expect("write")
            .expect("path");

        assert!(path.starts_with(second_dir.path()));
    }
}
