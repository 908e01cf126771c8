use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Errors produced while locating files on a storage cluster.
///
/// Cloneable so a single failure can be recorded on a locator and also handed
/// back to the caller.
#[derive(Debug, Error, Clone)]
pub enum LocateError {
    // Input Errors
    #[error("Invalid host key: {0}")]
    InvalidHost(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Connection Errors
    #[error("Connection to {host} failed: {source}")]
    ConnectionFailedTo {
        host: String,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("Connection to {host} failed: {reason}")]
    ConnectionFailed { host: String, reason: String },
    #[error("Connection to {host} timed out")]
    ConnectionTimedOut { host: String },
    #[error("Connection to {host} closed")]
    ConnectionClosed { host: String },
    #[error("Authentication failure on {host}: {message}")]
    NotAuthorized { host: String, message: String },
    #[error("Server {host} did not report a known server type")]
    UnknownServerType { host: String },
    #[error("Access to {host} failed after {attempts} attempts")]
    RetriesExhausted { host: String, attempts: usize },

    // Request Errors
    #[error("Locate of {path} on {host} timed out")]
    LocateTimedOut { host: String, path: String },
    #[error("Locate of {path} rejected by {host}: {message}")]
    Rejected {
        host: String,
        path: String,
        message: String,
    },
    #[error("Locate task aborted")]
    TaskAborted,

    // Response Errors
    #[error("Malformed node descriptor: {0}")]
    MalformedDescriptor(String),
    #[error("Address invalid: {0}")]
    AddressInvalid(String),
    #[error("Name not resolved for {addr}: {reason}")]
    NameNotResolvedFor { addr: String, reason: String },
}

impl LocateError {
    /// Create a connection error from an IO error.
    pub fn connection_failed_to(host: &str, source: io::Error) -> Self {
        Self::ConnectionFailedTo {
            host: host.to_string(),
            source: Arc::new(source),
        }
    }

    /// Whether a fresh connection attempt may succeed where this one failed.
    ///
    /// Authorization failures and unknown server types are final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LocateError::ConnectionFailedTo { .. }
                | LocateError::ConnectionFailed { .. }
                | LocateError::ConnectionTimedOut { .. }
                | LocateError::ConnectionClosed { .. }
        )
    }

    /// Whether the connection that produced this error must be dropped.
    pub fn invalidates_connection(&self) -> bool {
        self.is_retryable()
            || matches!(
                self,
                LocateError::Rejected { .. } | LocateError::LocateTimedOut { .. }
            )
    }
}
