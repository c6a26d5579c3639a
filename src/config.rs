//! Watch session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::WatchError;

/// Tunables for a watch session
///
/// Passed explicitly into each start operation and validated there once;
/// never re-read after the session starts. [`WatchConfig::from_env`] is the
/// opt-in loader for callers that configure through the environment at
/// process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Read buffer size in bytes
    #[serde(default = "default_buffer_bytes")]
    pub buffer_bytes: usize,

    /// Event channel capacity in chunks
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Inter-poll delay in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_buffer_bytes() -> usize {
    2048
}

fn default_channel_capacity() -> usize {
    100
}

fn default_poll_interval_ms() -> u64 {
    5000
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            buffer_bytes: 2048,
            channel_capacity: 100,
            poll_interval_ms: 5000,
        }
    }
}

impl WatchConfig {
    /// Environment variable overriding the read buffer size.
    pub const ENV_BUFFER_BYTES: &'static str = "FILETAIL_BUFFER_BYTES";
    /// Environment variable overriding the event channel capacity.
    pub const ENV_CHANNEL_CAPACITY: &'static str = "FILETAIL_CHANNEL_CAPACITY";
    /// Environment variable overriding the inter-poll delay.
    pub const ENV_POLL_INTERVAL_MS: &'static str = "FILETAIL_POLL_INTERVAL_MS";

    /// Read tunables once from the environment, falling back to the
    /// defaults for unset variables.
    ///
    /// Unparseable or zero values are fatal: callers should treat the error
    /// as a startup failure, not a per-session condition.
    pub fn from_env() -> Result<Self, WatchError> {
        let config = Self {
            buffer_bytes: env_value(Self::ENV_BUFFER_BYTES, default_buffer_bytes())?,
            channel_capacity: env_value(Self::ENV_CHANNEL_CAPACITY, default_channel_capacity())?,
            poll_interval_ms: env_value(Self::ENV_POLL_INTERVAL_MS, default_poll_interval_ms())?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration before use
    ///
    /// Called by every start operation so sessions fail fast with a clear
    /// error instead of spinning or panicking on a zero-capacity channel.
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.buffer_bytes == 0 {
            return Err(WatchError::Config("buffer-bytes must be nonzero".to_string()));
        }
        if self.channel_capacity == 0 {
            return Err(WatchError::Config("channel-capacity must be nonzero".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(WatchError::Config("poll-interval-ms must be nonzero".to_string()));
        }
        Ok(())
    }

    /// Get the inter-poll delay as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn env_value<T: std::str::FromStr>(name: &str, default: T) -> Result<T, WatchError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| WatchError::Config(format!("{name} must be a positive integer, got {raw:?}"))),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(WatchError::Config(format!("{name}: {e}"))),
    }
}
