//! Pipeline configuration
//!
//! [`LoggerConfig`] is the plain, serializable description handed to the
//! builder. [`SharedConfig`] is the live form owned by a running pipeline:
//! every tunable can be changed from any thread while logging continues.
//! Invalid values are corrected to defaults instead of being rejected.

use super::level_filter::LevelFilter;
use super::log_level::LogLevel;
use super::overflow_policy::OverflowPolicy;
use super::timestamp::TimestampFormat;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 200;
pub const DEFAULT_MAX_FILE_SIZE_MB: i64 = 500;
pub const DEFAULT_MAX_FILE_SIZE_BYTES: i64 = DEFAULT_MAX_FILE_SIZE_MB * BYTES_PER_MB;
pub const DEFAULT_DRAIN_INTERVAL_MS: u64 = 500;
pub const DEFAULT_MIN_DRAIN_INTERVAL_MS: u64 = 10;
pub const DEFAULT_DISPLAY_REFRESH_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_MAX_DISPLAY_ITEMS: usize = 1000;

const BYTES_PER_MB: i64 = 1024 * 1024;

/// Directory of the running executable, or `.` when it cannot be resolved.
pub fn default_log_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Static pipeline configuration
///
/// # Example
///
/// ```
/// use rust_batch_logger::{LogLevel, LoggerConfig};
///
/// let config = LoggerConfig::default()
///     .with_level(LogLevel::Debug)
///     .with_log_dir("/var/log/myapp")
///     .with_batch_size(500)
///     .with_max_file_size_mb(100);
///
/// assert_eq!(config.max_file_size_bytes, 100 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: LogLevel,
    /// Log files go to `{log_dir}/Log/`
    pub log_dir: PathBuf,
    pub batch_size: usize,
    /// Rotation threshold; values `<= 0` mean the 500 MiB default
    pub max_file_size_bytes: i64,
    /// Dispatcher sleep when the queue is empty
    pub drain_interval_ms: u64,
    /// Shortest dispatcher sleep under load
    pub min_drain_interval_ms: u64,
    /// Window in which display batches are coalesced
    pub display_refresh_interval_ms: u64,
    pub max_display_items: usize,
    pub console_enabled: bool,
    pub timestamp_format: TimestampFormat,
    /// `None` keeps the queue unbounded
    pub queue_capacity: Option<usize>,
    pub overflow_policy: OverflowPolicy,
    /// Skip entries routed to neither the file nor the display
    pub drop_unrouted: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_dir: default_log_dir(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            drain_interval_ms: DEFAULT_DRAIN_INTERVAL_MS,
            min_drain_interval_ms: DEFAULT_MIN_DRAIN_INTERVAL_MS,
            display_refresh_interval_ms: DEFAULT_DISPLAY_REFRESH_INTERVAL_MS,
            max_display_items: DEFAULT_MAX_DISPLAY_ITEMS,
            console_enabled: true,
            timestamp_format: TimestampFormat::default(),
            queue_capacity: None,
            overflow_policy: OverflowPolicy::default(),
            drop_unrouted: true,
        }
    }
}

impl LoggerConfig {
    #[must_use = "builder methods return a new value"]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_max_file_size_mb(mut self, mb: i64) -> Self {
        self.max_file_size_bytes = mb.saturating_mul(BYTES_PER_MB);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_max_file_size_bytes(mut self, bytes: i64) -> Self {
        self.max_file_size_bytes = bytes;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval_ms = duration_to_ms(interval);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_min_drain_interval(mut self, interval: Duration) -> Self {
        self.min_drain_interval_ms = duration_to_ms(interval);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_display_refresh_interval(mut self, interval: Duration) -> Self {
        self.display_refresh_interval_ms = duration_to_ms(interval);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_max_display_items(mut self, count: usize) -> Self {
        self.max_display_items = count;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_console_enabled(mut self, enabled: bool) -> Self {
        self.console_enabled = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_queue_capacity(mut self, capacity: usize, policy: OverflowPolicy) -> Self {
        self.queue_capacity = Some(capacity);
        self.overflow_policy = policy;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_drop_unrouted(mut self, drop_unrouted: bool) -> Self {
        self.drop_unrouted = drop_unrouted;
        self
    }
}

fn duration_to_ms(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

fn sanitize_batch_size(size: usize) -> usize {
    if size == 0 {
        DEFAULT_BATCH_SIZE
    } else {
        size
    }
}

fn sanitize_interval(ms: u64, default: u64) -> u64 {
    if ms == 0 {
        default
    } else {
        ms
    }
}

fn sanitize_file_size(bytes: i64) -> i64 {
    if bytes <= 0 {
        DEFAULT_MAX_FILE_SIZE_BYTES
    } else {
        bytes
    }
}

/// Live configuration shared by producers, the dispatcher and the sinks
///
/// Primitive settings are atomics and are read without locking. The log
/// directory and timestamp format are behind a `RwLock`.
#[derive(Debug)]
pub struct SharedConfig {
    filter: LevelFilter,
    log_dir: RwLock<PathBuf>,
    batch_size: AtomicUsize,
    max_file_size_bytes: AtomicI64,
    drain_interval_ms: AtomicU64,
    min_drain_interval_ms: AtomicU64,
    display_refresh_interval_ms: AtomicU64,
    max_display_items: AtomicUsize,
    console_enabled: AtomicBool,
    timestamp_format: RwLock<TimestampFormat>,
    drop_unrouted: AtomicBool,
}

impl SharedConfig {
    pub fn new(config: LoggerConfig) -> Self {
        let shared = Self {
            filter: LevelFilter::new(config.level),
            log_dir: RwLock::new(config.log_dir),
            batch_size: AtomicUsize::new(sanitize_batch_size(config.batch_size)),
            max_file_size_bytes: AtomicI64::new(sanitize_file_size(config.max_file_size_bytes)),
            drain_interval_ms: AtomicU64::new(sanitize_interval(
                config.drain_interval_ms,
                DEFAULT_DRAIN_INTERVAL_MS,
            )),
            min_drain_interval_ms: AtomicU64::new(0),
            display_refresh_interval_ms: AtomicU64::new(sanitize_interval(
                config.display_refresh_interval_ms,
                DEFAULT_DISPLAY_REFRESH_INTERVAL_MS,
            )),
            max_display_items: AtomicUsize::new(config.max_display_items.max(1)),
            console_enabled: AtomicBool::new(config.console_enabled),
            timestamp_format: RwLock::new(config.timestamp_format.sanitized()),
            drop_unrouted: AtomicBool::new(config.drop_unrouted),
        };
        shared.set_min_drain_interval(Duration::from_millis(config.min_drain_interval_ms));
        shared
    }

    /// Admission filter backed by this configuration's threshold
    pub fn filter(&self) -> &LevelFilter {
        &self.filter
    }

    pub fn level(&self) -> LogLevel {
        self.filter.threshold()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.filter.set_threshold(level);
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.read().clone()
    }

    pub fn set_log_dir(&self, dir: impl Into<PathBuf>) {
        *self.log_dir.write() = dir.into();
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.load(Ordering::Relaxed)
    }

    pub fn set_batch_size(&self, size: usize) {
        self.batch_size
            .store(sanitize_batch_size(size), Ordering::Relaxed);
    }

    /// Rotation threshold in bytes, always positive.
    ///
    /// A non-positive value that slipped in is replaced by the default here.
    pub fn max_file_size_bytes(&self) -> u64 {
        let current = self.max_file_size_bytes.load(Ordering::Relaxed);
        if current <= 0 {
            self.max_file_size_bytes
                .store(DEFAULT_MAX_FILE_SIZE_BYTES, Ordering::Relaxed);
            return DEFAULT_MAX_FILE_SIZE_BYTES as u64;
        }
        current as u64
    }

    pub fn set_max_file_size_bytes(&self, bytes: i64) {
        self.max_file_size_bytes
            .store(sanitize_file_size(bytes), Ordering::Relaxed);
    }

    pub fn set_max_file_size_mb(&self, mb: i64) {
        self.set_max_file_size_bytes(mb.saturating_mul(BYTES_PER_MB));
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms.load(Ordering::Relaxed))
    }

    pub fn set_drain_interval(&self, interval: Duration) {
        let ms = sanitize_interval(duration_to_ms(interval), DEFAULT_DRAIN_INTERVAL_MS);
        self.drain_interval_ms.store(ms, Ordering::Relaxed);
        if self.min_drain_interval_ms.load(Ordering::Relaxed) > ms {
            self.min_drain_interval_ms.store(ms, Ordering::Relaxed);
        }
    }

    /// Floor of the adaptive sleep, never above the idle interval
    pub fn min_drain_interval(&self) -> Duration {
        let floor = self.min_drain_interval_ms.load(Ordering::Relaxed);
        let ceiling = self.drain_interval_ms.load(Ordering::Relaxed);
        Duration::from_millis(floor.min(ceiling))
    }

    pub fn set_min_drain_interval(&self, interval: Duration) {
        let ms = duration_to_ms(interval).max(1);
        let ceiling = self.drain_interval_ms.load(Ordering::Relaxed);
        self.min_drain_interval_ms
            .store(ms.min(ceiling), Ordering::Relaxed);
    }

    pub fn display_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.display_refresh_interval_ms.load(Ordering::Relaxed))
    }

    pub fn set_display_refresh_interval(&self, interval: Duration) {
        let ms = sanitize_interval(duration_to_ms(interval), DEFAULT_DISPLAY_REFRESH_INTERVAL_MS);
        self.display_refresh_interval_ms
            .store(ms, Ordering::Relaxed);
    }

    pub fn max_display_items(&self) -> usize {
        self.max_display_items.load(Ordering::Relaxed)
    }

    pub fn set_max_display_items(&self, count: usize) {
        self.max_display_items
            .store(count.max(1), Ordering::Relaxed);
    }

    pub fn console_enabled(&self) -> bool {
        self.console_enabled.load(Ordering::Relaxed)
    }

    pub fn set_console_enabled(&self, enabled: bool) {
        self.console_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn timestamp_format(&self) -> TimestampFormat {
        self.timestamp_format.read().clone()
    }

    pub fn set_timestamp_format(&self, format: TimestampFormat) {
        *self.timestamp_format.write() = format.sanitized();
    }

    pub fn drop_unrouted(&self) -> bool {
        self.drop_unrouted.load(Ordering::Relaxed)
    }

    pub fn set_drop_unrouted(&self, drop_unrouted: bool) {
        self.drop_unrouted.store(drop_unrouted, Ordering::Relaxed);
    }

    /// Current values as a plain config.
    ///
    /// Queue bounds are fixed at construction and live on the queue, so the
    /// snapshot reports the unbounded defaults for them.
    pub fn snapshot(&self) -> LoggerConfig {
        LoggerConfig {
            level: self.level(),
            log_dir: self.log_dir(),
            batch_size: self.batch_size(),
            max_file_size_bytes: self.max_file_size_bytes() as i64,
            drain_interval_ms: self.drain_interval_ms.load(Ordering::Relaxed),
            min_drain_interval_ms: self.min_drain_interval_ms.load(Ordering::Relaxed),
            display_refresh_interval_ms: self.display_refresh_interval_ms.load(Ordering::Relaxed),
            max_display_items: self.max_display_items(),
            console_enabled: self.console_enabled(),
            timestamp_format: self.timestamp_format(),
            queue_capacity: None,
            overflow_policy: OverflowPolicy::default(),
            drop_unrouted: self.drop_unrouted(),
        }
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(LoggerConfig::default())
    }
}

impl From<LoggerConfig> for SharedConfig {
    fn from(config: LoggerConfig) -> Self {
        Self::new(config)
    }
}
