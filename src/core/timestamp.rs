//! Timestamp formatting utilities
//!
//! Entries carry local wall-clock time. The default layout matches the
//! plain `2025-01-08 10:30:45` form used in log files and on the console.

use super::error::LoggerError;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// strftime layout behind [`TimestampFormat::Standard`]
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp format options
///
/// # Examples
///
/// ```
/// use rust_batch_logger::TimestampFormat;
/// use chrono::{Local, TimeZone};
///
/// let at = Local.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
/// assert_eq!(TimestampFormat::Standard.format(&at), "2025-01-08 10:30:45");
/// assert_eq!(TimestampFormat::Custom("%H:%M".into()).format(&at), "10:30");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// `2025-01-08 10:30:45`
    #[default]
    Standard,

    /// ISO 8601 with milliseconds and offset: `2025-01-08T10:30:45.123+01:00`
    Iso8601,

    /// RFC 3339: `2025-01-08T10:30:45.123456789+01:00`
    Rfc3339,

    /// Unix timestamp in milliseconds: `1736332245123`
    UnixMillis,

    /// Any strftime-compatible format string
    Custom(String),
}

impl TimestampFormat {
    #[must_use]
    pub fn format<Tz>(&self, datetime: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        match self {
            TimestampFormat::Standard => datetime.format(DEFAULT_TIMESTAMP_FORMAT).to_string(),
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string(),
            TimestampFormat::Rfc3339 => datetime.to_rfc3339(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::Custom(format_str) => {
                // `to_string` panics when the pattern fails to render
                let mut out = String::new();
                if write!(out, "{}", datetime.format(format_str)).is_err() {
                    return datetime.format(DEFAULT_TIMESTAMP_FORMAT).to_string();
                }
                out
            }
        }
    }

    /// Build from a user-supplied strftime string, mapping the default layout
    /// back to `Standard`. Unparseable patterns also map to `Standard`.
    #[must_use]
    pub fn from_pattern(pattern: &str) -> Self {
        if pattern == DEFAULT_TIMESTAMP_FORMAT {
            TimestampFormat::Standard
        } else {
            TimestampFormat::Custom(pattern.to_string()).sanitized()
        }
    }

    /// Replace a `Custom` pattern chrono cannot parse with `Standard`,
    /// reporting the rejected pattern on stderr.
    #[must_use]
    pub fn sanitized(self) -> Self {
        match self {
            TimestampFormat::Custom(pattern) if !is_valid_pattern(&pattern) => {
                let error = LoggerError::config(
                    "timestamp_format",
                    format!("unsupported strftime pattern '{}'", pattern),
                );
                eprintln!("[LOGGER WARNING] {}; using default layout", error);
                TimestampFormat::Standard
            }
            other => other,
        }
    }
}

/// Whether every specifier in `pattern` is one chrono understands.
#[must_use]
pub fn is_valid_pattern(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}
