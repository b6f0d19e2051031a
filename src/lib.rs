//! # Rust Batch Logger
//!
//! An embeddable logging pipeline. Application threads hand entries to a
//! queue without blocking; one background dispatcher drains it in adaptive
//! batches and fans them out to a rolling file sink and an optional display
//! sink, each on its own worker. A console sink prints inline on the calling
//! thread.
//!
//! ## Features
//!
//! - **Non-blocking producers**: level check, optional console line, enqueue
//! - **Adaptive batching**: bigger batches and shorter sleeps as the queue grows
//! - **Rolling files**: `Log_YYYY_MM_DD[_N].log` under `{log_dir}/Log/`
//! - **Isolated sinks**: a failing or slow sink never stalls the others
//! - **Live configuration**: level, sizes, intervals and paths change at runtime
//!
//! ## Example
//!
//! ```no_run
//! use rust_batch_logger::prelude::*;
//!
//! let logger = Logger::builder()
//!     .level(LogLevel::Debug)
//!     .log_dir("/var/log/myapp")
//!     .display_buffer()
//!     .build()
//!     .unwrap();
//!
//! logger.info("service started");
//! logger.error_to_file("migration skipped", None);
//! logger.flush_all().unwrap();
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        BatchSink, DispatcherState, LogEntry, LogLevel, LogOptions, Logger, LoggerBuilder,
        LoggerConfig, LoggerError, OverflowCallback, OverflowPolicy, PipelineMetrics, Result,
        Routes, SharedConfig, TimestampFormat, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::sinks::{ChannelDisplaySink, ConsoleSink, DisplayBuffer, DisplayItem, RollingFileSink};
}

pub use crate::core::{
    adaptive_batch_size, adaptive_interval, describe_error, should_emit, BatchSink,
    DispatcherState, EnqueueOutcome, IngestQueue, LevelFilter, LogEntry, LogLevel, LogOptions,
    Logger, LoggerBuilder, LoggerConfig, LoggerError, OverflowCallback, OverflowPolicy,
    PipelineMetrics, Result, Routes, SharedConfig, SinkFactory, TimestampFormat,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use sinks::{ChannelDisplaySink, ConsoleSink, DisplayBuffer, DisplayItem, RollingFileSink};
