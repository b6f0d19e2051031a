//! Log entry structure

use super::log_level::LogLevel;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::error::Error;

/// Which sinks a logging call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routes {
    pub display: bool,
    pub file: bool,
    pub console: bool,
}

impl Routes {
    pub const fn all() -> Self {
        Self {
            display: true,
            file: true,
            console: true,
        }
    }

    /// File only; the console is skipped as well.
    pub const fn file_only() -> Self {
        Self {
            display: false,
            file: true,
            console: false,
        }
    }

    /// Display and console, never the file.
    pub const fn display_only() -> Self {
        Self {
            display: true,
            file: false,
            console: true,
        }
    }

    #[must_use]
    pub const fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Neither queued sink wants the entry
    pub const fn is_unrouted(&self) -> bool {
        !self.display && !self.file
    }
}

impl Default for Routes {
    fn default() -> Self {
        Self::all()
    }
}

/// Optional arguments of a logging call.
///
/// # Example
///
/// ```
/// use rust_batch_logger::{LogOptions, Routes};
///
/// let options = LogOptions::new()
///     .display_message("Upload failed, retrying")
///     .routes(Routes::all().with_console(false));
/// assert!(!options.routes.console);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub display_message: Option<String>,
    pub routes: Routes,
    pub cause: Option<String>,
}

impl LogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn display_message(mut self, message: impl Into<String>) -> Self {
        self.display_message = Some(message.into());
        self
    }

    #[must_use]
    pub fn routes(mut self, routes: Routes) -> Self {
        self.routes = routes;
        self
    }

    /// Attach an error; its description is appended to the file message.
    #[must_use]
    pub fn cause(mut self, error: &dyn Error) -> Self {
        self.cause = Some(describe_error(error));
        self
    }
}

/// Render an error and its `source()` chain, one cause per line.
pub fn describe_error(error: &dyn Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        text.push_str("\n  caused by: ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}

/// One logging call, frozen at the call site.
///
/// Fields are private; an entry is only ever built up before it is queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    timestamp: DateTime<Local>,
    level: LogLevel,
    raw_message: String,
    display_message: Option<String>,
    route_to_display: bool,
    route_to_file: bool,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            raw_message: message.into(),
            display_message: None,
            route_to_display: true,
            route_to_file: true,
        }
    }

    /// Build an entry from a logging call's arguments.
    pub fn from_options(level: LogLevel, message: impl Into<String>, options: LogOptions) -> Self {
        let mut entry = Self::new(level, message).with_routes(options.routes);
        if let Some(display) = options.display_message {
            entry = entry.with_display_message(display);
        }
        if let Some(cause) = options.cause {
            entry = entry.with_cause_text(&cause);
        }
        entry
    }

    /// Blank display text is treated as absent.
    #[must_use]
    pub fn with_display_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.display_message = if message.trim().is_empty() {
            None
        } else {
            Some(message)
        };
        self
    }

    #[must_use]
    pub fn with_routes(mut self, routes: Routes) -> Self {
        self.route_to_display = routes.display;
        self.route_to_file = routes.file;
        self
    }

    #[must_use]
    pub fn with_cause(self, error: &dyn Error) -> Self {
        let cause = describe_error(error);
        self.with_cause_text(&cause)
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub(crate) fn with_cause_text(mut self, cause: &str) -> Self {
        self.raw_message.push('\n');
        self.raw_message.push_str(cause);
        self
    }

    pub fn timestamp(&self) -> &DateTime<Local> {
        &self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Full text for the file sink, including any appended cause
    pub fn raw_message(&self) -> &str {
        &self.raw_message
    }

    /// Text for the display sink; falls back to the raw message
    pub fn display_message(&self) -> &str {
        self.display_message.as_deref().unwrap_or(&self.raw_message)
    }

    pub fn has_display_message(&self) -> bool {
        self.display_message.is_some()
    }

    pub fn route_to_display(&self) -> bool {
        self.route_to_display
    }

    pub fn route_to_file(&self) -> bool {
        self.route_to_file
    }
}
