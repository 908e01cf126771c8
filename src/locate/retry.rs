//! Connection retry policy.
//!
//! Every connection attempt is classified into an [`AttemptOutcome`]; the
//! connect loop in the locator acts on the outcome instead of inspecting
//! errors directly.

use crate::base::locateerror::LocateError;
use crate::locate::config::LocateConfig;
use std::time::Duration;

/// Classified result of one connection attempt.
pub enum AttemptOutcome<T> {
    /// The server accepted the session.
    Success(T),
    /// Transient failure; another attempt may succeed.
    Retry(LocateError),
    /// Final failure; further attempts are pointless.
    Abort(LocateError),
}

impl<T> AttemptOutcome<T> {
    /// Classify the result of an attempt.
    pub fn from_result(result: Result<T, LocateError>) -> Self {
        match result {
            Ok(session) => Self::Success(session),
            Err(e) if e.is_retryable() => Self::Retry(e),
            Err(e) => Self::Abort(e),
        }
    }
}

impl<T> std::fmt::Debug for AttemptOutcome<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success(_) => f.write_str("Success"),
            Self::Retry(e) => f.debug_tuple("Retry").field(e).finish(),
            Self::Abort(e) => f.debug_tuple("Abort").field(e).finish(),
        }
    }
}

/// Configuration for connection retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of connection attempts (default: 3)
    pub max_attempts: usize,
    /// Fixed wait between attempts (default: 1s)
    pub reconnect_wait: Duration,
    /// Hard budget of a single attempt (default: 10s)
    pub op_time_limit: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&LocateConfig::default())
    }
}

impl From<&LocateConfig> for RetryConfig {
    fn from(config: &LocateConfig) -> Self {
        Self {
            max_attempts: config.connect_max_retry,
            reconnect_wait: config.reconnect_wait_duration(),
            op_time_limit: config.op_time_limit_duration(),
        }
    }
}

impl RetryConfig {
    /// Create a config with a single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Wait before attempt number `attempt` (zero-based).
///
/// The first attempt starts immediately; later ones wait the fixed interval.
pub fn calculate_backoff(attempt: usize, config: &RetryConfig) -> Duration {
    if attempt == 0 {
        Duration::ZERO
    } else {
        config.reconnect_wait
    }
}

/// Check if attempt number `attempt` (zero-based) is allowed.
pub fn should_retry(attempt: usize, config: &RetryConfig) -> bool {
    attempt < config.max_attempts
}
