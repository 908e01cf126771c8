//! Locate and cache configuration.

use crate::base::locateerror::LocateError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the number of connection attempts.
pub const ENV_CONNECT_MAX_RETRY: &str = "XRD_FIRSTCONNECTMAXCNT";
/// Environment variable holding the wait between attempts, in seconds.
pub const ENV_RECONNECT_WAIT: &str = "XRD_RECONNECTWAIT";
/// Environment variable holding the per-operation time limit, in seconds.
pub const ENV_OP_TIME_LIMIT: &str = "XRD_TRANSACTIONTIMEOUT";

/// Static configuration for the location cache and remote locators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocateConfig {
    /// Lifetime of a cache entry in seconds (default: 900)
    pub lifetime_secs: u64,
    /// Minimum seconds between two prune sweeps (default: 60)
    pub prune_interval_secs: u64,
    /// Connection attempts per connect (default: 3)
    pub connect_max_retry: usize,
    /// Milliseconds to sleep between connection attempts (default: 1000)
    pub reconnect_wait_ms: u64,
    /// Budget in milliseconds for one connection attempt or one locate
    /// request (default: 10000)
    pub op_time_limit_ms: u64,
    /// Caller-side wait for a locate response in milliseconds (default: 50)
    pub locate_timeout_ms: u64,
    /// Port assumed when a host key carries none (default: 1094)
    pub default_port: u16,
}

impl Default for LocateConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: 15 * 60,
            prune_interval_secs: 60,
            connect_max_retry: 3,
            reconnect_wait_ms: 1_000,
            op_time_limit_ms: 10_000,
            locate_timeout_ms: 50,
            default_port: 1094,
        }
    }
}

impl LocateConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, LocateError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| LocateError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LocateError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| LocateError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Defaults overlaid with the storage client's environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Overlay values from `lookup`, ignoring unparseable ones.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(n) = parse_env(&lookup, ENV_CONNECT_MAX_RETRY) {
            self.connect_max_retry = n;
        }
        // Both variables are expressed in whole seconds.
        if let Some(secs) = parse_env::<u64>(&lookup, ENV_RECONNECT_WAIT) {
            self.reconnect_wait_ms = secs.saturating_mul(1_000);
        }
        if let Some(secs) = parse_env::<u64>(&lookup, ENV_OP_TIME_LIMIT) {
            self.op_time_limit_ms = secs.saturating_mul(1_000);
        }
        self
    }

    /// Reject settings that would make the locator unusable.
    pub fn validate(&self) -> Result<(), LocateError> {
        if self.connect_max_retry == 0 {
            return Err(LocateError::InvalidConfig(
                "connect_max_retry must be at least 1".into(),
            ));
        }
        if self.op_time_limit_ms == 0 {
            return Err(LocateError::InvalidConfig(
                "op_time_limit_ms must be positive".into(),
            ));
        }
        if self.locate_timeout_ms == 0 {
            return Err(LocateError::InvalidConfig(
                "locate_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Set the cache entry lifetime, truncated to whole seconds.
    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime_secs = lifetime.as_secs();
        self
    }

    /// Set the number of connection attempts.
    pub fn connect_max_retry(mut self, attempts: usize) -> Self {
        self.connect_max_retry = attempts;
        self
    }

    /// Set the wait between connection attempts.
    pub fn reconnect_wait(mut self, wait: Duration) -> Self {
        self.reconnect_wait_ms = millis(wait);
        self
    }

    /// Set the per-operation time limit.
    pub fn op_time_limit(mut self, limit: Duration) -> Self {
        self.op_time_limit_ms = millis(limit);
        self
    }

    /// Set the caller-side locate deadline.
    pub fn locate_timeout(mut self, timeout: Duration) -> Self {
        self.locate_timeout_ms = millis(timeout);
        self
    }

    pub fn lifetime_duration(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }

    pub fn reconnect_wait_duration(&self) -> Duration {
        Duration::from_millis(self.reconnect_wait_ms)
    }

    pub fn op_time_limit_duration(&self) -> Duration {
        Duration::from_millis(self.op_time_limit_ms)
    }

    pub fn locate_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.locate_timeout_ms)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}
