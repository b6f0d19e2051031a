//! Core pipeline types and traits

#[cfg(feature = "async-sinks")]
pub mod async_sink;
pub mod config;
pub mod dispatcher;
pub mod error;
mod lane;
pub mod level_filter;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod queue;
pub mod sink;
pub mod timestamp;

#[cfg(feature = "async-sinks")]
pub use async_sink::{AsyncBatchSink, BlockingAsyncSink};
pub use config::{LoggerConfig, SharedConfig};
pub use dispatcher::{adaptive_batch_size, adaptive_interval, DispatcherState};
pub use error::{LoggerError, Result};
pub use level_filter::{should_emit, LevelFilter};
pub use log_entry::{describe_error, LogEntry, LogOptions, Routes};
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder, SinkFactory, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::PipelineMetrics;
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use queue::{EnqueueOutcome, IngestQueue};
pub use sink::BatchSink;
pub use timestamp::TimestampFormat;
