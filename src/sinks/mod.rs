//! Sink implementations

pub mod console;
pub mod display;
pub mod rolling_file;

#[cfg(feature = "async-sinks")]
pub mod async_file;

pub use console::ConsoleSink;
pub use display::{ChannelDisplaySink, DisplayBuffer, DisplayItem};
pub use rolling_file::{format_batch, log_file_name, log_folder, select_log_file, RollingFileSink};

#[cfg(feature = "async-sinks")]
pub use async_file::AsyncRollingFileSink;

pub use crate::core::BatchSink;
#[cfg(feature = "async-sinks")]
pub use crate::core::{AsyncBatchSink, BlockingAsyncSink};
