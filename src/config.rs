//! Configuration for the reporting framework.
//!
//! Settings are plain serde structs with defaults taken from the reference
//! deployment, a `validate()` pass run before boot, builder-style setters,
//! and environment-variable overrides applied last.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for one agent process.
///
/// # Examples
///
/// ```rust
/// use reporter_core::config::ReporterConfig;
/// use std::time::Duration;
///
/// let config = ReporterConfig::default()
///     .with_endpoint("collector.internal:11800")
///     .with_producer_interval(Duration::from_secs(1));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Outbound collector channel settings.
    pub collector: CollectorConfig,

    /// Runtime-metrics stream settings.
    pub metrics: StreamConfig,
}

/// Settings for the single outbound channel to the collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Collector address, `host:port`.
    pub endpoint: String,

    /// Interval between reconnect attempts while disconnected.
    pub reconnect_interval: Duration,

    /// Bound on one connection attempt.
    pub connect_timeout: Duration,

    /// Bound on one frame read or write.
    pub io_timeout: Duration,

    /// Largest frame accepted in either direction, in bytes.
    pub max_frame_len: usize,
}

/// Per-stream settings for a producer/buffer/sender unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Capacity of the pending-record buffer; overflow evicts the oldest.
    pub buffer_capacity: usize,

    /// Producer sampling period (P1).
    pub producer_interval: Duration,

    /// Sender flush period (P2), independent of the producer.
    pub sender_interval: Duration,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            collector: CollectorConfig::default(),
            metrics: StreamConfig::default(),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:11800".to_owned(),
            reconnect_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(10),
            max_frame_len: 1024 * 1024,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 600,
            producer_interval: Duration::from_secs(1),
            sender_interval: Duration::from_secs(1),
        }
    }
}

impl ReporterConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value would make the pipeline inoperable.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.collector.endpoint.is_empty() {
            anyhow::bail!("collector.endpoint cannot be empty");
        }

        if self.collector.reconnect_interval.is_zero() {
            anyhow::bail!("collector.reconnect_interval must be greater than 0");
        }

        if self.collector.connect_timeout.is_zero() {
            anyhow::bail!("collector.connect_timeout must be greater than 0");
        }

        if self.collector.io_timeout.is_zero() {
            anyhow::bail!("collector.io_timeout must be greater than 0");
        }

        if self.collector.max_frame_len == 0 {
            anyhow::bail!("collector.max_frame_len must be greater than 0");
        }

        if self.metrics.buffer_capacity == 0 {
            anyhow::bail!("metrics.buffer_capacity must be greater than 0");
        }

        if self.metrics.producer_interval.is_zero() {
            anyhow::bail!("metrics.producer_interval must be greater than 0");
        }

        if self.metrics.sender_interval.is_zero() {
            anyhow::bail!("metrics.sender_interval must be greater than 0");
        }

        if self.metrics.buffer_capacity < 16 {
            tracing::warn!(
                buffer_capacity = self.metrics.buffer_capacity,
                "metrics.buffer_capacity is very small, overflow eviction will be frequent"
            );
        }

        Ok(())
    }

    /// Sets the collector endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.collector.endpoint = endpoint.into();
        self
    }

    /// Sets the reconnect interval.
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.collector.reconnect_interval = interval;
        self
    }

    /// Sets the per-frame IO timeout.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.collector.io_timeout = timeout;
        self
    }

    /// Sets the metrics buffer capacity.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.metrics.buffer_capacity = capacity;
        self
    }

    /// Sets the producer sampling interval.
    pub fn with_producer_interval(mut self, interval: Duration) -> Self {
        self.metrics.producer_interval = interval;
        self
    }

    /// Sets the sender flush interval.
    pub fn with_sender_interval(mut self, interval: Duration) -> Self {
        self.metrics.sender_interval = interval;
        self
    }

    /// Applies `REPORTER_*` environment variable overrides.
    ///
    /// Recognized: `REPORTER_COLLECTOR_ENDPOINT`, `REPORTER_BUFFER_CAPACITY`,
    /// `REPORTER_PRODUCER_INTERVAL_SECS`, `REPORTER_SENDER_INTERVAL_SECS`.
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("REPORTER_COLLECTOR_ENDPOINT") {
            if !endpoint.is_empty() {
                self.collector.endpoint = endpoint;
            }
        }

        if let Ok(val) = std::env::var("REPORTER_BUFFER_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                self.metrics.buffer_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("REPORTER_PRODUCER_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.metrics.producer_interval = Duration::from_secs(secs);
            }
        }

        if let Ok(val) = std::env::var("REPORTER_SENDER_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.metrics.sender_interval = Duration::from_secs(secs);
            }
        }

        self
    }
}
