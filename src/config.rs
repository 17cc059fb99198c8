//! Server configuration
//!
//! Defaults mirror the historical deployment (port 8080, five workers,
//! a ten-slot task queue, ten-second liveness reports). Each field can be
//! overridden through a `METADATA_SERVER_*` environment variable.

use std::env;
use std::time::Duration;

/// Default bind address
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Default number of pool workers
pub const DEFAULT_WORKERS: usize = 5;

/// Default task queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Default monitor report interval in seconds
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 10;

/// Runtime configuration for one server instance
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listener bind address
    pub bind_addr: String,
    /// Number of session workers in the pool
    pub worker_count: usize,
    /// Capacity of the pool's task queue
    pub queue_capacity: usize,
    /// Interval between monitor liveness reports
    pub monitor_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            worker_count: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            monitor_interval: Duration::from_secs(DEFAULT_MONITOR_INTERVAL_SECS),
        }
    }
}

impl ServerConfig {
    /// Build a configuration from the environment
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = env::var("METADATA_SERVER_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(n) = read_env_usize("METADATA_SERVER_WORKERS") {
            config.worker_count = n.max(1);
        }
        if let Some(n) = read_env_usize("METADATA_SERVER_QUEUE") {
            config.queue_capacity = n.max(1);
        }
        if let Some(n) = read_env_usize("METADATA_SERVER_MONITOR_SECS") {
            config.monitor_interval = Duration::from_secs(n as u64);
        }

        config
    }
}

fn read_env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, DEFAULT_ADDR);
        assert_eq!(config.worker_count, 5);
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.monitor_interval, Duration::from_secs(10));
    }
}
