//! Tailer configuration.

use crate::error::{Error, Result};
use std::time::Duration;

/// Delay between two read passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound of a single wait while paused. The loop re-checks the stop
/// flag after every timeout.
pub const DEFAULT_PAUSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Name given to the worker thread.
pub const DEFAULT_THREAD_NAME: &str = "log-tailer";

/// Settings for a [`Tailer`](crate::Tailer).
///
/// ```
/// use log_tailer::TailerConfig;
/// use std::time::Duration;
///
/// let config = TailerConfig::default()
///     .with_poll_interval(Duration::from_millis(250))
///     .with_start_paused(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailerConfig {
    pub poll_interval: Duration,
    pub pause_timeout: Duration,
    /// Whether a new tailer starts in the paused state.
    pub start_paused: bool,
    pub thread_name: String,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            pause_timeout: DEFAULT_PAUSE_TIMEOUT,
            start_paused: false,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl TailerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_pause_timeout(mut self, timeout: Duration) -> Self {
        self.pause_timeout = timeout;
        self
    }

    pub fn with_start_paused(mut self, paused: bool) -> Self {
        self.start_paused = paused;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Rejects values the tail loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(invalid("poll interval must be non-zero"));
        }
        if self.pause_timeout.is_zero() {
            return Err(invalid("pause timeout must be non-zero"));
        }
        if self.thread_name.trim().is_empty() {
            return Err(invalid("thread name must not be empty"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidConfig {
        message: message.to_string(),
    }
}
