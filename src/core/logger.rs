//! Main logger implementation

use super::{
    config::{LoggerConfig, SharedConfig},
    dispatcher::{DispatcherHandle, DispatcherState, Pipeline, DEFAULT_FLUSH_TIMEOUT},
    error::Result,
    lane::SinkLane,
    log_entry::{LogEntry, LogOptions, Routes},
    log_level::LogLevel,
    metrics::PipelineMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy},
    queue::IngestQueue,
    sink::BatchSink,
    timestamp::TimestampFormat,
};
use crate::sinks::{ConsoleSink, DisplayBuffer, RollingFileSink};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default shutdown timeout for logger cleanup (5 seconds)
///
/// This timeout is used when the logger is dropped without explicit shutdown.
/// For custom timeout control, use the `shutdown()` method instead.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds a queued sink once the pipeline's live configuration exists
pub type SinkFactory = Box<dyn FnOnce(Arc<SharedConfig>) -> Result<Box<dyn BatchSink>> + Send>;

/// Front end of the pipeline
///
/// Logging calls never block on I/O and never fail: they filter by level,
/// print to the console if asked, and queue the entry for the background
/// dispatcher. Share a logger between threads with `Arc<Logger>`.
///
/// # Example
///
/// ```no_run
/// use rust_batch_logger::{Logger, LogLevel};
///
/// let logger = Logger::builder()
///     .level(LogLevel::Debug)
///     .log_dir("/var/log/myapp")
///     .build()
///     .unwrap();
///
/// logger.info("service started");
/// logger.warn_to_file("cache cold, warming up");
/// logger.flush_all().unwrap();
/// ```
pub struct Logger {
    pipeline: Arc<Pipeline>,
    dispatcher: DispatcherHandle,
    lanes: Vec<SinkLane>,
    console: ConsoleSink,
    display_buffer: Option<DisplayBuffer>,
    closed: bool,
}

impl Logger {
    /// Create a builder for Logger
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Logger with the default sinks and the given configuration
    pub fn with_config(config: LoggerConfig) -> Result<Self> {
        LoggerBuilder::new().config(config).build()
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        !self.closed && self.pipeline.config.filter().should_emit(level)
    }

    #[inline]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.log_with(level, message, LogOptions::default());
    }

    /// Log with a display text, routes or a cause
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_batch_logger::{Logger, LogLevel, LogOptions, Routes};
    ///
    /// let logger = Logger::builder().build().unwrap();
    /// logger.log_with(
    ///     LogLevel::Warn,
    ///     "retry 3/5 for GET /api/items: 503",
    ///     LogOptions::new()
    ///         .display_message("Server busy, retrying")
    ///         .routes(Routes::all().with_console(false)),
    /// );
    /// ```
    pub fn log_with(&self, level: LogLevel, message: impl Into<String>, options: LogOptions) {
        if !self.is_enabled(level) {
            return;
        }
        self.submit(level, message.into(), options);
    }

    fn submit(&self, level: LogLevel, message: String, mut options: LogOptions) {
        // The console line shows the cause on its own; the file copy gets it appended.
        let cause = options.cause.take();
        let routes = options.routes;
        let config = &self.pipeline.config;

        let mut entry = LogEntry::from_options(level, message, options);

        if routes.console && config.console_enabled() {
            let timestamp = config.timestamp_format().format(entry.timestamp());
            self.console
                .write(&timestamp, level, entry.raw_message(), cause.as_deref());
        }

        if routes.is_unrouted() && config.drop_unrouted() {
            self.pipeline.metrics.record_unrouted();
            return;
        }

        if let Some(cause) = cause {
            entry = entry.with_cause_text(&cause);
        }
        self.pipeline.queue.enqueue(entry);
    }

    /// File only, no display and no console
    fn log_to_file(&self, level: LogLevel, message: impl Into<String>, cause: Option<&dyn Error>) {
        if !self.is_enabled(level) {
            return;
        }
        let mut options = LogOptions::new().routes(Routes::file_only());
        if let Some(cause) = cause {
            options = options.cause(cause);
        }
        self.submit(level, message.into(), options);
    }

    /// Display and console, never the file. The display shows the message
    /// without the cause.
    fn log_to_display(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        cause: Option<&dyn Error>,
    ) {
        if !self.is_enabled(level) {
            return;
        }
        let message = message.into();
        let mut options = LogOptions::new()
            .display_message(message.clone())
            .routes(Routes::display_only());
        if let Some(cause) = cause {
            options = options.cause(cause);
        }
        self.submit(level, message, options);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(LogLevel::Fatal, message);
    }

    /// Error with its cause chain appended to the file text
    pub fn error_with(&self, message: impl Into<String>, cause: &dyn Error) {
        self.log_with(LogLevel::Error, message, LogOptions::new().cause(cause));
    }

    pub fn fatal_with(&self, message: impl Into<String>, cause: &dyn Error) {
        self.log_with(LogLevel::Fatal, message, LogOptions::new().cause(cause));
    }

    pub fn debug_to_file(&self, message: impl Into<String>) {
        self.log_to_file(LogLevel::Debug, message, None);
    }

    pub fn info_to_file(&self, message: impl Into<String>) {
        self.log_to_file(LogLevel::Info, message, None);
    }

    pub fn warn_to_file(&self, message: impl Into<String>) {
        self.log_to_file(LogLevel::Warn, message, None);
    }

    pub fn error_to_file(&self, message: impl Into<String>, cause: Option<&dyn Error>) {
        self.log_to_file(LogLevel::Error, message, cause);
    }

    pub fn fatal_to_file(&self, message: impl Into<String>, cause: Option<&dyn Error>) {
        self.log_to_file(LogLevel::Fatal, message, cause);
    }

    pub fn debug_to_display(&self, message: impl Into<String>) {
        self.log_to_display(LogLevel::Debug, message, None);
    }

    pub fn info_to_display(&self, message: impl Into<String>) {
        self.log_to_display(LogLevel::Info, message, None);
    }

    pub fn warn_to_display(&self, message: impl Into<String>) {
        self.log_to_display(LogLevel::Warn, message, None);
    }

    pub fn error_to_display(&self, message: impl Into<String>, cause: Option<&dyn Error>) {
        self.log_to_display(LogLevel::Error, message, cause);
    }

    pub fn fatal_to_display(&self, message: impl Into<String>, cause: Option<&dyn Error>) {
        self.log_to_display(LogLevel::Fatal, message, cause);
    }

    pub fn set_level(&self, level: LogLevel) {
        self.pipeline.config.set_level(level);
    }

    pub fn level(&self) -> LogLevel {
        self.pipeline.config.level()
    }

    /// Live configuration; setters take effect from the next call or batch.
    pub fn config(&self) -> &Arc<SharedConfig> {
        &self.pipeline.config
    }

    /// Write everything queued right now to the file sink and return once
    /// it is on disk. Display entries are forwarded without waiting.
    ///
    /// Calling it again with nothing queued writes nothing.
    pub fn flush_all(&self) -> Result<()> {
        self.pipeline.flush_all(DEFAULT_FLUSH_TIMEOUT)
    }

    /// Copy of the oldest queued entry
    pub fn try_peek(&self) -> Option<LogEntry> {
        self.pipeline.queue.try_peek()
    }

    /// Take the oldest queued entry away from the dispatcher
    pub fn try_dequeue(&self) -> Option<LogEntry> {
        self.pipeline.queue.try_dequeue()
    }

    /// Take up to `max` queued entries, oldest first
    pub fn drain(&self, max: usize) -> Vec<LogEntry> {
        self.pipeline.queue.drain(max)
    }

    pub fn queue_depth(&self) -> usize {
        self.pipeline.queue.len()
    }

    /// Get the pipeline metrics for detailed observability
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_batch_logger::Logger;
    ///
    /// let logger = Logger::builder().build().unwrap();
    ///
    /// // After logging operations...
    /// let metrics = logger.metrics();
    /// println!("Dropped: {}", metrics.dropped_count());
    /// println!("Dispatched: {}", metrics.entries_dispatched());
    /// println!("Drop rate: {:.2}%", metrics.drop_rate());
    /// ```
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.pipeline.metrics
    }

    /// `true` while the dispatcher thread is running its loop
    pub fn is_alive(&self) -> bool {
        self.dispatcher.is_alive()
    }

    pub fn dispatcher_state(&self) -> DispatcherState {
        self.dispatcher.state()
    }

    /// Time since the dispatcher last started a cycle
    pub fn heartbeat_age(&self) -> Duration {
        self.dispatcher.heartbeat_age()
    }

    /// The built-in display buffer, if the builder enabled it
    pub fn display_buffer(&self) -> Option<&DisplayBuffer> {
        self.display_buffer.as_ref()
    }

    pub fn console(&self) -> &ConsoleSink {
        &self.console
    }

    /// Gracefully shutdown the logger with a custom timeout
    ///
    /// Stops the dispatcher, flushes whatever is still queued and closes the
    /// sink lanes. Logging calls made afterwards are ignored.
    ///
    /// **Note**: When the logger is dropped without calling `shutdown()` explicitly,
    /// it uses [`DEFAULT_SHUTDOWN_TIMEOUT`] (5 seconds).
    ///
    /// # Returns
    ///
    /// `true` if shutdown completed successfully within timeout, `false` otherwise
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_batch_logger::Logger;
    /// use std::time::Duration;
    ///
    /// let mut logger = Logger::builder().build().unwrap();
    /// logger.info("Important message");
    ///
    /// if !logger.shutdown(Duration::from_secs(10)) {
    ///     eprintln!("Warning: Logger shutdown timed out");
    /// }
    /// ```
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        if self.closed {
            return true;
        }
        self.closed = true;

        let deadline = Instant::now() + timeout;
        let remaining = || deadline.saturating_duration_since(Instant::now());

        let mut clean = self.dispatcher.stop(timeout);

        if let Err(e) = self.pipeline.flush_all(remaining()) {
            eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
            clean = false;
        }

        for lane in &mut self.lanes {
            clean &= lane.close(remaining());
        }

        let dropped = self.pipeline.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger shutting down with {} dropped entries (drop rate: {:.2}%)",
                dropped,
                self.pipeline.metrics.drop_rate()
            );
        }

        clean
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("queue", &self.pipeline.queue)
            .field("dispatcher", &self.dispatcher_state())
            .field("closed", &self.closed)
            .finish()
    }
}

enum SinkSlot {
    Builtin,
    Custom(SinkFactory),
    Disabled,
}

/// Builder for constructing Logger with a fluent API
///
/// By default the logger writes rolling files under `{log_dir}/Log/`, prints
/// to the console and has no display sink.
///
/// # Example
/// ```no_run
/// use rust_batch_logger::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder()
///     .level(LogLevel::Debug)
///     .log_dir("/var/log/myapp")
///     .batch_size(500)
///     .max_file_size_mb(100)
///     .display_buffer()
///     .queue_capacity(100_000, OverflowPolicy::DropOldest)
///     .on_overflow(Arc::new(|count| {
///         eprintln!("ALERT: {} entries dropped", count);
///     }))
///     .build()
///     .unwrap();
/// ```
pub struct LoggerBuilder {
    config: LoggerConfig,
    on_overflow: Option<OverflowCallback>,
    file_sink: SinkSlot,
    display_sink: SinkSlot,
    console: ConsoleSink,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
            on_overflow: None,
            file_sink: SinkSlot::Builtin,
            display_sink: SinkSlot::Disabled,
            console: ConsoleSink::new(),
        }
    }

    /// Replace the whole configuration
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_file_size_mb(mut self, mb: i64) -> Self {
        self.config = self.config.with_max_file_size_mb(mb);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_file_size_bytes(mut self, bytes: i64) -> Self {
        self.config.max_file_size_bytes = bytes;
        self
    }

    /// Dispatcher sleep when the queue is empty
    #[must_use = "builder methods return a new value"]
    pub fn drain_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_drain_interval(interval);
        self
    }

    /// Shortest dispatcher sleep under load
    #[must_use = "builder methods return a new value"]
    pub fn min_drain_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_min_drain_interval(interval);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn display_refresh_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_display_refresh_interval(interval);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_display_items(mut self, count: usize) -> Self {
        self.config.max_display_items = count;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn console_enabled(mut self, enabled: bool) -> Self {
        self.config.console_enabled = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.config.timestamp_format = format;
        self
    }

    /// Bound the queue; `policy` decides what a full queue gives up
    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize, policy: OverflowPolicy) -> Self {
        self.config = self.config.with_queue_capacity(capacity, policy);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn drop_unrouted(mut self, drop_unrouted: bool) -> Self {
        self.config.drop_unrouted = drop_unrouted;
        self
    }

    /// Set a callback for overflow notifications
    ///
    /// The callback is invoked when entries are dropped by a bounded queue.
    /// The parameter is the total count of dropped entries.
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Use `sink` for file-routed entries instead of the rolling file sink
    #[must_use = "builder methods return a new value"]
    pub fn file_sink<S: BatchSink + 'static>(mut self, sink: S) -> Self {
        self.file_sink = SinkSlot::Custom(Box::new(
            move |_: Arc<SharedConfig>| -> Result<Box<dyn BatchSink>> { Ok(Box::new(sink)) },
        ));
        self
    }

    /// Build the file sink from the pipeline's live configuration
    #[must_use = "builder methods return a new value"]
    pub fn file_sink_with<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(Arc<SharedConfig>) -> Result<Box<dyn BatchSink>> + Send + 'static,
    {
        self.file_sink = SinkSlot::Custom(Box::new(factory));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn without_file_sink(mut self) -> Self {
        self.file_sink = SinkSlot::Disabled;
        self
    }

    /// Send display-routed entries to `sink`
    #[must_use = "builder methods return a new value"]
    pub fn display_sink<S: BatchSink + 'static>(mut self, sink: S) -> Self {
        self.display_sink = SinkSlot::Custom(Box::new(
            move |_: Arc<SharedConfig>| -> Result<Box<dyn BatchSink>> { Ok(Box::new(sink)) },
        ));
        self
    }

    /// Keep display-routed entries in a [`DisplayBuffer`] reachable through
    /// [`Logger::display_buffer`]
    #[must_use = "builder methods return a new value"]
    pub fn display_buffer(mut self) -> Self {
        self.display_sink = SinkSlot::Builtin;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn console_sink(mut self, console: ConsoleSink) -> Self {
        self.console = console;
        self
    }

    /// Start the sink lanes and the dispatcher
    ///
    /// # Errors
    ///
    /// Fails if a sink factory fails or a worker thread cannot be spawned.
    pub fn build(self) -> Result<Logger> {
        let config = Arc::new(SharedConfig::new(self.config.clone()));
        let metrics = Arc::new(PipelineMetrics::new());
        let queue = match self.config.queue_capacity {
            Some(capacity) => IngestQueue::bounded(
                capacity,
                self.config.overflow_policy,
                Arc::clone(&metrics),
                self.on_overflow,
            ),
            None => IngestQueue::unbounded(Arc::clone(&metrics)),
        };

        let mut lanes = Vec::new();

        let file_sink: Option<Box<dyn BatchSink>> = match self.file_sink {
            SinkSlot::Builtin => Some(Box::new(RollingFileSink::new(Arc::clone(&config)))),
            SinkSlot::Custom(factory) => Some(factory(Arc::clone(&config))?),
            SinkSlot::Disabled => None,
        };
        let file_lane = match file_sink {
            Some(sink) => {
                let lane = SinkLane::spawn(sink, Arc::clone(&metrics), None)?;
                let handle = lane.handle();
                lanes.push(lane);
                Some(handle)
            }
            None => None,
        };

        let mut display_buffer = None;
        let display_sink: Option<Box<dyn BatchSink>> = match self.display_sink {
            SinkSlot::Builtin => {
                let buffer = DisplayBuffer::with_config(Arc::clone(&config));
                display_buffer = Some(buffer.clone());
                Some(Box::new(buffer))
            }
            SinkSlot::Custom(factory) => Some(factory(Arc::clone(&config))?),
            SinkSlot::Disabled => None,
        };
        let display_lane = match display_sink {
            Some(sink) => {
                let lane = SinkLane::spawn(sink, Arc::clone(&metrics), Some(Arc::clone(&config)))?;
                let handle = lane.handle();
                lanes.push(lane);
                Some(handle)
            }
            None => None,
        };

        let pipeline = Arc::new(Pipeline::new(
            queue,
            config,
            metrics,
            file_lane,
            display_lane,
        ));
        let dispatcher = DispatcherHandle::spawn(Arc::clone(&pipeline))?;

        Ok(Logger {
            pipeline,
            dispatcher,
            lanes,
            console: self.console,
            display_buffer,
            closed: false,
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timestamp::DEFAULT_TIMESTAMP_FORMAT;
    use parking_lot::Mutex;
    use std::fmt;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct Recorded(Arc<Mutex<Vec<LogEntry>>>);

    impl Recorded {
        fn messages(&self) -> Vec<String> {
            self.0
                .lock()
                .iter()
                .map(|e| e.raw_message().to_string())
                .collect()
        }
    }

    struct RecordingSink(Recorded);

    impl BatchSink for RecordingSink {
        fn write_batch(&mut self, entries: &[LogEntry]) -> Result<()> {
            self.0 .0.lock().extend_from_slice(entries);
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[derive(Debug)]
    struct Refused;

    impl fmt::Display for Refused {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "connection refused")
        }
    }

    impl Error for Refused {}

    fn quiet_builder() -> (LoggerBuilder, Recorded, ConsoleSink) {
        let file = Recorded::default();
        let console = ConsoleSink::captured();
        let builder = Logger::builder()
            .level(LogLevel::Debug)
            .drain_interval(Duration::from_millis(20))
            .file_sink(RecordingSink(file.clone()))
            .console_sink(console.clone());
        (builder, file, console)
    }

    #[test]
    fn test_below_threshold_has_no_effect() {
        let (builder, file, console) = quiet_builder();
        let logger = builder.level(LogLevel::Warn).build().expect("logger");

        logger.debug("hidden");
        logger.info_to_file("hidden");
        logger.warn("shown");
        logger.flush_all().expect("flush");

        assert_eq!(file.messages(), vec!["shown"]);
        assert_eq!(console.captured_output().lines().count(), 1);
        assert_eq!(logger.metrics().enqueued(), 1);
    }

    #[test]
    fn test_set_level_at_runtime() {
        let (builder, file, _console) = quiet_builder();
        let logger = builder.build().expect("logger");

        logger.set_level(LogLevel::Error);
        assert_eq!(logger.level(), LogLevel::Error);
        assert!(!logger.is_enabled(LogLevel::Warn));
        logger.warn("dropped");
        logger.error("kept");
        logger.flush_all().expect("flush");

        assert_eq!(file.messages(), vec!["kept"]);
    }

    #[test]
    fn test_to_file_skips_console_and_display() {
        let (builder, file, console) = quiet_builder();
        let logger = builder.display_buffer().build().expect("logger");

        logger.info_to_file("file only");
        logger.flush_all().expect("flush");

        assert_eq!(file.messages(), vec!["file only"]);
        assert!(console.captured_output().is_empty());
        let recorded = file.0.lock();
        assert!(!recorded[0].route_to_display());
    }

    #[test]
    fn test_to_display_skips_file_keeps_console() {
        let (builder, file, console) = quiet_builder();
        let logger = builder
            .display_buffer()
            .display_refresh_interval(Duration::from_millis(10))
            .build()
            .expect("logger");

        logger.warn_to_display("screen only");
        logger.flush_all().expect("flush");

        let buffer = logger.display_buffer().expect("display buffer").clone();
        let deadline = Instant::now() + Duration::from_secs(5);
        while buffer.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(file.messages().is_empty());
        assert_eq!(buffer.snapshot()[0].message, "screen only");
        assert!(console.captured_output().contains("WARN screen only"));
    }

    #[test]
    fn test_cause_is_appended_for_file_and_split_for_console() {
        let (builder, file, console) = quiet_builder();
        let logger = builder.build().expect("logger");

        logger.error_with("sync failed", &Refused);
        logger.flush_all().expect("flush");

        assert_eq!(file.messages(), vec!["sync failed\nconnection refused"]);
        let output = console.captured_output();
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].ends_with("ERROR sync failed"));
        assert_eq!(lines[1], "connection refused");
    }

    #[test]
    fn test_log_with_carries_display_message_routes_and_cause() {
        let (builder, file, console) = quiet_builder();
        let logger = builder.build().expect("logger");

        logger.log_with(
            LogLevel::Warn,
            "retry 3/5: 503",
            LogOptions::new()
                .display_message("Server busy")
                .routes(Routes::all().with_console(false))
                .cause(&Refused),
        );
        logger.flush_all().expect("flush");

        let recorded = file.0.lock();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].raw_message(), "retry 3/5: 503\nconnection refused");
        assert_eq!(recorded[0].display_message(), "Server busy");
        assert!(recorded[0].route_to_display());
        assert!(console.captured_output().is_empty());
    }

    #[test]
    fn test_unparseable_timestamp_pattern_falls_back_on_console() {
        let (builder, file, console) = quiet_builder();
        let logger = builder
            .timestamp_format(TimestampFormat::Custom("%Q".into()))
            .build()
            .expect("logger");

        let call = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            logger.info("hello");
        }));
        assert!(call.is_ok());
        logger.flush_all().expect("flush");

        assert_eq!(file.messages(), vec!["hello"]);
        let output = console.captured_output();
        let (timestamp, rest) = output.split_once(": ").expect("console line");
        assert!(chrono::NaiveDateTime::parse_from_str(timestamp, DEFAULT_TIMESTAMP_FORMAT).is_ok());
        assert_eq!(rest.trim_end(), "INFO hello");
    }

    #[test]
    fn test_error_to_display_shows_message_without_cause() {
        let (builder, file, _console) = quiet_builder();
        let display = Recorded::default();
        let logger = builder
            .display_sink(RecordingSink(display.clone()))
            .display_refresh_interval(Duration::from_millis(10))
            .build()
            .expect("logger");

        logger.error_to_display("upload failed", Some(&Refused));
        logger.flush_all().expect("flush");

        let deadline = Instant::now() + Duration::from_secs(5);
        while display.0.lock().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        let shown = display.0.lock();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].display_message(), "upload failed");
        assert_eq!(shown[0].raw_message(), "upload failed\nconnection refused");
        assert!(file.messages().is_empty());
    }

    #[test]
    fn test_queue_can_be_pulled_directly() {
        let (builder, file, _console) = quiet_builder();
        let logger = builder
            .drain_interval(Duration::from_secs(60))
            .build()
            .expect("logger");

        // after its startup cycle the dispatcher sits in the long idle sleep
        std::thread::sleep(Duration::from_millis(100));

        logger.info("a");
        logger.info("b");
        logger.info("c");
        assert_eq!(logger.queue_depth(), 3);
        assert_eq!(logger.try_peek().map(|e| e.raw_message().to_string()), Some("a".into()));
        assert_eq!(logger.try_dequeue().map(|e| e.raw_message().to_string()), Some("a".into()));
        assert_eq!(logger.drain(10).len(), 2);
        assert_eq!(logger.queue_depth(), 0);
        assert!(file.messages().is_empty());
    }

    #[test]
    fn test_unrouted_entries_are_skipped() {
        let (builder, _file, console) = quiet_builder();
        let logger = builder.build().expect("logger");

        let nowhere = Routes {
            display: false,
            file: false,
            console: true,
        };
        logger.log_with(LogLevel::Info, "console only", LogOptions::new().routes(nowhere));

        assert_eq!(logger.metrics().unrouted_skipped(), 1);
        assert_eq!(logger.metrics().enqueued(), 0);
        assert!(console.captured_output().contains("INFO console only"));
    }

    #[test]
    fn test_unrouted_entries_can_be_kept() {
        let (builder, _file, _console) = quiet_builder();
        let logger = builder
            .drop_unrouted(false)
            .drain_interval(Duration::from_secs(60))
            .build()
            .expect("logger");

        let nowhere = Routes {
            display: false,
            file: false,
            console: false,
        };
        logger.log_with(LogLevel::Info, "kept", LogOptions::new().routes(nowhere));

        assert_eq!(logger.metrics().enqueued(), 1);
        assert_eq!(logger.metrics().unrouted_skipped(), 0);
    }

    #[test]
    fn test_console_toggle() {
        let (builder, _file, console) = quiet_builder();
        let logger = builder.console_enabled(false).build().expect("logger");

        logger.info("quiet");
        assert!(console.captured_output().is_empty());

        logger.config().set_console_enabled(true);
        logger.info("loud");
        assert_eq!(console.captured_output().lines().count(), 1);
    }

    #[test]
    fn test_shutdown_flushes_and_ignores_later_calls() {
        let (builder, file, _console) = quiet_builder();
        let mut logger = builder
            .drain_interval(Duration::from_secs(60))
            .build()
            .expect("logger");

        assert!(logger.is_alive());
        for i in 0..10 {
            logger.info(format!("entry {}", i));
        }
        assert!(logger.shutdown(Duration::from_secs(5)));
        assert!(!logger.is_alive());
        assert_eq!(logger.dispatcher_state(), DispatcherState::Stopped);
        assert_eq!(file.messages().len(), 10);

        logger.info("after shutdown");
        assert_eq!(logger.queue_depth(), 0);
        assert!(logger.shutdown(Duration::from_secs(1)));
    }

    #[test]
    fn test_default_file_sink_writes_under_log_dir() {
        let dir = TempDir::new().expect("temp dir");
        let logger = Logger::builder()
            .log_dir(dir.path())
            .console_sink(ConsoleSink::captured())
            .build()
            .expect("logger");

        logger.info("to disk");
        logger.flush_all().expect("flush");

        let files: Vec<_> = std::fs::read_dir(dir.path().join("Log"))
            .expect("log folder")
            .collect();
        assert_eq!(files.len(), 1);
    }
}
