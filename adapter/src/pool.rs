//! Connection pool configuration
//!
//! Pool sizing is explicit: maximum and minimum connections, acquire
//! timeout, and connection lifetimes. The SQLite introspection fan-out is
//! bounded by `max_connections`, so the pool size doubles as the
//! concurrency cap.

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Database pool configuration with conservative defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Minimum number of connections to maintain.
    pub min_connections: u32,

    /// Maximum number of connections allowed.
    pub max_connections: u32,

    /// Timeout for acquiring a connection from the pool.
    pub acquire_timeout_seconds: u64,

    /// Maximum connection lifetime before recycling.
    pub max_lifetime_seconds: Option<u64>,

    /// Idle timeout before a connection is closed.
    pub idle_timeout_seconds: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 10,
            acquire_timeout_seconds: 30,
            max_lifetime_seconds: Some(1800), // 30 minutes
            idle_timeout_seconds: Some(600),  // 10 minutes
        }
    }
}

impl PoolConfig {
    /// Pool configuration from environment variables, falling back to the
    /// defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable when a set value fails to
    /// parse or the combination is invalid.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(max_str) = std::env::var("STRATA_POOL_MAX_CONNECTIONS") {
            config.max_connections = max_str
                .parse()
                .map_err(|_| anyhow!("invalid STRATA_POOL_MAX_CONNECTIONS value: {max_str}"))?;
        }

        if let Ok(min_str) = std::env::var("STRATA_POOL_MIN_CONNECTIONS") {
            config.min_connections = min_str
                .parse()
                .map_err(|_| anyhow!("invalid STRATA_POOL_MIN_CONNECTIONS value: {min_str}"))?;
        }

        if let Ok(timeout_str) = std::env::var("STRATA_POOL_ACQUIRE_TIMEOUT") {
            config.acquire_timeout_seconds = timeout_str
                .parse()
                .map_err(|_| anyhow!("invalid STRATA_POOL_ACQUIRE_TIMEOUT value: {timeout_str}"))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(anyhow!("max_connections must be greater than 0"));
        }
        if self.min_connections > self.max_connections {
            return Err(anyhow!(
                "min_connections ({}) cannot be greater than max_connections ({})",
                self.min_connections,
                self.max_connections
            ));
        }
        if self.acquire_timeout_seconds == 0 {
            return Err(anyhow!("acquire_timeout_seconds must be greater than 0"));
        }
        Ok(())
    }

    /// Acquire timeout as a `Duration`.
    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    /// Maximum connection lifetime as a `Duration`.
    #[must_use]
    pub fn max_lifetime(&self) -> Option<Duration> {
        self.max_lifetime_seconds.map(Duration::from_secs)
    }

    /// Idle timeout as a `Duration`.
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_seconds.map(Duration::from_secs)
    }

    /// Log a one-line summary of the sizing (no credentials involved).
    pub fn log_summary(&self) {
        info!(
            min = self.min_connections,
            max = self.max_connections,
            acquire_timeout_secs = self.acquire_timeout_seconds,
            "database pool configuration"
        );
    }
}
