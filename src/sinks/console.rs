//! Console sink
//!
//! Runs inline on the calling thread, one entry at a time, so console order
//! is exactly call order. Errors writing to the terminal are ignored.

use crate::core::log_level::LogLevel;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

#[cfg(feature = "console")]
use colored::Colorize;

#[derive(Clone)]
enum Target {
    Std,
    Captured(Arc<Mutex<Vec<u8>>>),
}

/// Colored `{timestamp}: {LEVEL} {message}` lines, Error and Fatal on stderr
///
/// Clones share the destination; a clone of a captured sink sees the same
/// buffer.
#[derive(Clone)]
pub struct ConsoleSink {
    target: Target,
    use_colors: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            target: Target::Std,
            use_colors: true,
        }
    }

    /// Sink that writes into memory instead of the terminal, uncolored by
    /// default. Read it back with [`ConsoleSink::captured_output`].
    pub fn captured() -> Self {
        Self {
            target: Target::Captured(Arc::new(Mutex::new(Vec::new()))),
            use_colors: false,
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Everything written so far, or an empty string for a terminal sink
    pub fn captured_output(&self) -> String {
        match &self.target {
            Target::Std => String::new(),
            Target::Captured(buffer) => String::from_utf8_lossy(&buffer.lock()).into_owned(),
        }
    }

    /// Print one entry. A cause goes on the following line, uncolored.
    pub fn write(&self, timestamp: &str, level: LogLevel, message: &str, cause: Option<&str>) {
        let line = format!("{}: {} {}", timestamp, level.to_str(), message);
        let mut text = self.paint(level, line);
        if let Some(cause) = cause {
            text.push('\n');
            text.push_str(cause);
        }

        let to_stderr = matches!(level, LogLevel::Error | LogLevel::Fatal);
        match &self.target {
            Target::Std if to_stderr => {
                let _ = writeln!(io::stderr().lock(), "{}", text);
            }
            Target::Std => {
                let _ = writeln!(io::stdout().lock(), "{}", text);
            }
            Target::Captured(buffer) => {
                let _ = writeln!(buffer.lock(), "{}", text);
            }
        }
    }

    #[cfg_attr(not(feature = "console"), allow(unused_variables))]
    fn paint(&self, level: LogLevel, line: String) -> String {
        #[cfg(feature = "console")]
        {
            if self.use_colors {
                return line.color(level.color_code()).to_string();
            }
        }
        line
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = match self.target {
            Target::Std => "std",
            Target::Captured(_) => "captured",
        };
        f.debug_struct("ConsoleSink")
            .field("target", &target)
            .field("use_colors", &self.use_colors)
            .finish()
    }
}
