//! Severity admission
//!
//! The threshold is read on every logging call, so it lives in an atomic.
//! Writers and readers may briefly disagree after a change; that is fine.

use super::log_level::LogLevel;
use std::sync::atomic::{AtomicU8, Ordering};

/// Admission policy: `true` iff `level >= threshold`.
#[inline]
pub fn should_emit(threshold: LogLevel, level: LogLevel) -> bool {
    level >= threshold
}

#[derive(Debug)]
pub struct LevelFilter {
    threshold: AtomicU8,
}

impl LevelFilter {
    pub fn new(threshold: LogLevel) -> Self {
        Self {
            threshold: AtomicU8::new(threshold.as_u8()),
        }
    }

    #[inline]
    pub fn threshold(&self) -> LogLevel {
        LogLevel::from_u8(self.threshold.load(Ordering::Relaxed))
    }

    pub fn set_threshold(&self, level: LogLevel) {
        self.threshold.store(level.as_u8(), Ordering::Relaxed);
    }

    #[inline]
    pub fn should_emit(&self, level: LogLevel) -> bool {
        should_emit(self.threshold(), level)
    }
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self::new(LogLevel::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_emit_matrix() {
        for threshold in LogLevel::ALL {
            for level in LogLevel::ALL {
                assert_eq!(should_emit(threshold, level), level >= threshold);
            }
        }
    }

    #[test]
    fn test_threshold_update() {
        let filter = LevelFilter::new(LogLevel::Warn);
        assert!(!filter.should_emit(LogLevel::Info));
        assert!(filter.should_emit(LogLevel::Warn));

        filter.set_threshold(LogLevel::Debug);
        assert_eq!(filter.threshold(), LogLevel::Debug);
        assert!(filter.should_emit(LogLevel::Debug));
    }

    #[test]
    fn test_default_threshold_is_info() {
        let filter = LevelFilter::default();
        assert!(!filter.should_emit(LogLevel::Debug));
        assert!(filter.should_emit(LogLevel::Info));
    }
}
