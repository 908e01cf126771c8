//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors into context-rich `LocateError` variants.

use crate::base::locateerror::LocateError;
use std::io;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use xrdsites::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await
    ///     .connection_context("redirector.example.org:1094")?;
    /// // Error: "Connection to redirector.example.org:1094 failed: connection refused"
    /// ```
    fn connection_context(self, host: &str) -> Result<T, LocateError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connection_context(self, host: &str) -> Result<T, LocateError> {
        self.map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => LocateError::ConnectionClosed {
                host: host.to_string(),
            },
            _ => LocateError::connection_failed_to(host, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_connection_context() {
        let result: Result<(), io::Error> =
            Err(Error::new(ErrorKind::ConnectionRefused, "refused"));
        let err = result.connection_context("xrd.example.org:1094").unwrap_err();

        match err {
            LocateError::ConnectionFailedTo { host, .. } => {
                assert_eq!(host, "xrd.example.org:1094");
            }
            _ => panic!("Expected ConnectionFailedTo"),
        }
    }

    #[test]
    fn test_connection_context_eof_is_closed() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::UnexpectedEof, "eof"));
        let err = result.connection_context("xrd.example.org:1094").unwrap_err();
        assert!(matches!(err, LocateError::ConnectionClosed { .. }));
        assert!(err.is_retryable());
    }
}
