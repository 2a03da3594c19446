//! # Player Configuration
//!
//! Process-level settings for the streaming core.
//!
//! ## Overview
//!
//! `PlayerConfig` groups the tunables of every subsystem (retry policy,
//! network engines, pre-cache pool, event delivery, engine buffering). All
//! fields carry serde defaults so a host can ship a partial JSON document.
//! The builder enforces fail-fast validation: the only required value is the
//! cache directory.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::PlayerConfig;
//!
//! let config = PlayerConfig::builder()
//!     .cache_dir("/data/user/0/app/cache/media")
//!     .max_retry_attempts(2)
//!     .precache_workers(4)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the cache directory created under the host cache root.
pub const DEFAULT_CACHE_DIR_NAME: &str = "stream-cache";

// ============================================================================
// Retry
// ============================================================================

/// Bounded retry with a fixed delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Consecutive retries allowed before downgrade/fatal.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the pipeline is re-attached.
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

// ============================================================================
// Network
// ============================================================================

/// Network engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Allow the high-performance engine at all.
    #[serde(default = "default_true")]
    pub enable_high_performance: bool,

    /// Request the high-performance engine for every HTTP source instead of
    /// HLS only.
    #[serde(default)]
    pub high_performance_for_all_http: bool,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Used when the source headers carry no `User-Agent`.
    #[serde(default = "default_user_agent")]
    pub default_user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enable_high_performance: true,
            high_performance_for_all_http: false,
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            default_user_agent: default_user_agent(),
        }
    }
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}

fn default_read_timeout_ms() -> u64 {
    15_000
}

fn default_user_agent() -> String {
    format!("stream-player/{}", env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Pre-cache
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreCacheConfig {
    /// Size of the background worker pool.
    #[serde(default = "default_precache_workers")]
    pub workers: usize,

    /// Read size used when draining a response into the cache.
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,
}

impl Default for PreCacheConfig {
    fn default() -> Self {
        Self {
            workers: default_precache_workers(),
            read_chunk_bytes: default_read_chunk_bytes(),
        }
    }
}

fn default_precache_workers() -> usize {
    4
}

fn default_read_chunk_bytes() -> usize {
    64 * 1024
}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventConfig {
    /// Records allocated up front.
    #[serde(default = "default_pool_initial")]
    pub pool_initial: usize,

    /// Records kept for reuse; extra records are dropped.
    #[serde(default = "default_pool_max")]
    pub pool_max: usize,

    /// Minimum spacing of periodic `bufferingUpdate` events.
    #[serde(default = "default_buffering_update_interval_ms")]
    pub buffering_update_interval_ms: u64,

    /// Capacity of the service event bus.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            pool_initial: default_pool_initial(),
            pool_max: default_pool_max(),
            buffering_update_interval_ms: default_buffering_update_interval_ms(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

fn default_pool_initial() -> usize {
    10
}

fn default_pool_max() -> usize {
    30
}

fn default_buffering_update_interval_ms() -> u64 {
    600
}

fn default_bus_capacity() -> usize {
    100
}

// ============================================================================
// Engine buffering
// ============================================================================

/// Buffering thresholds handed to the host media engine.
///
/// Values are milliseconds of media. Zero or negative values coming from the
/// host fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    #[serde(default = "default_min_buffer_ms")]
    pub min_buffer_ms: i64,

    #[serde(default = "default_max_buffer_ms")]
    pub max_buffer_ms: i64,

    #[serde(default = "default_buffer_for_playback_ms")]
    pub buffer_for_playback_ms: i64,

    #[serde(default = "default_buffer_after_rebuffer_ms")]
    pub buffer_for_playback_after_rebuffer_ms: i64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            min_buffer_ms: default_min_buffer_ms(),
            max_buffer_ms: default_max_buffer_ms(),
            buffer_for_playback_ms: default_buffer_for_playback_ms(),
            buffer_for_playback_after_rebuffer_ms: default_buffer_after_rebuffer_ms(),
        }
    }
}

impl BufferConfig {
    /// Replace non-positive values with the defaults.
    pub fn normalized(self) -> Self {
        fn pick(value: i64, fallback: i64) -> i64 {
            if value > 0 {
                value
            } else {
                fallback
            }
        }

        Self {
            min_buffer_ms: pick(self.min_buffer_ms, default_min_buffer_ms()),
            max_buffer_ms: pick(self.max_buffer_ms, default_max_buffer_ms()),
            buffer_for_playback_ms: pick(
                self.buffer_for_playback_ms,
                default_buffer_for_playback_ms(),
            ),
            buffer_for_playback_after_rebuffer_ms: pick(
                self.buffer_for_playback_after_rebuffer_ms,
                default_buffer_after_rebuffer_ms(),
            ),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let normalized = self.normalized();
        if normalized.min_buffer_ms > normalized.max_buffer_ms {
            return Err(Error::Config(format!(
                "min_buffer_ms ({}) exceeds max_buffer_ms ({})",
                normalized.min_buffer_ms, normalized.max_buffer_ms
            )));
        }
        Ok(())
    }
}

fn default_min_buffer_ms() -> i64 {
    30_000
}

fn default_max_buffer_ms() -> i64 {
    30_000
}

fn default_buffer_for_playback_ms() -> i64 {
    3_000
}

fn default_buffer_after_rebuffer_ms() -> i64 {
    5_000
}

// ============================================================================
// Top level
// ============================================================================

/// Complete configuration for the streaming core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Directory that holds cached media spans and the cache index.
    pub cache_dir: PathBuf,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub precache: PreCacheConfig,

    #[serde(default)]
    pub events: EventConfig,

    /// Defaults for sessions created without explicit buffering.
    #[serde(default)]
    pub buffer: BufferConfig,
}

impl PlayerConfig {
    pub fn builder() -> PlayerConfigBuilder {
        PlayerConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - Cache directory is not empty
    /// - The worker pool has at least one worker
    /// - The event pool cap is not below its pre-warm size
    /// - Buffer thresholds are consistent
    pub fn validate(&self) -> Result<()> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::Config("Cache directory cannot be empty".to_string()));
        }

        if self.precache.workers == 0 {
            return Err(Error::Config(
                "Pre-cache pool needs at least one worker".to_string(),
            ));
        }

        if self.precache.read_chunk_bytes == 0 {
            return Err(Error::Config(
                "Pre-cache read chunk must be greater than 0 bytes".to_string(),
            ));
        }

        if self.events.pool_max < self.events.pool_initial {
            return Err(Error::Config(format!(
                "Event pool cap ({}) is below its initial size ({})",
                self.events.pool_max, self.events.pool_initial
            )));
        }

        if self.events.bus_capacity == 0 {
            return Err(Error::Config(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if self.network.connect_timeout_ms == 0 || self.network.read_timeout_ms == 0 {
            return Err(Error::Config(
                "Network timeouts must be greater than 0 ms".to_string(),
            ));
        }

        self.buffer.validate()
    }
}

/// Builder for constructing [`PlayerConfig`] instances.
#[derive(Debug, Default)]
pub struct PlayerConfigBuilder {
    cache_dir: Option<PathBuf>,
    retry: RetryConfig,
    network: NetworkConfig,
    precache: PreCacheConfig,
    events: EventConfig,
    buffer: BufferConfig,
}

impl PlayerConfigBuilder {
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    pub fn max_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry.max_attempts = attempts;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry.delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn enable_high_performance(mut self, enabled: bool) -> Self {
        self.network.enable_high_performance = enabled;
        self
    }

    pub fn high_performance_for_all_http(mut self, enabled: bool) -> Self {
        self.network.high_performance_for_all_http = enabled;
        self
    }

    pub fn default_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.network.default_user_agent = user_agent.into();
        self
    }

    pub fn precache_workers(mut self, workers: usize) -> Self {
        self.precache.workers = workers;
        self
    }

    pub fn event_pool(mut self, initial: usize, max: usize) -> Self {
        self.events.pool_initial = initial;
        self.events.pool_max = max;
        self
    }

    pub fn buffering_update_interval(mut self, interval: Duration) -> Self {
        self.events.buffering_update_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn buffer(mut self, buffer: BufferConfig) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn build(self) -> Result<PlayerConfig> {
        let cache_dir = self.cache_dir.ok_or_else(|| {
            Error::Config("Cache directory is required. Use .cache_dir() to set it.".to_string())
        })?;

        let config = PlayerConfig {
            cache_dir,
            retry: self.retry,
            network: self.network,
            precache: self.precache,
            events: self.events,
            buffer: self.buffer,
        };

        config.validate()?;
        Ok(config)
    }
}
