//! Transport abstraction for talking to a storage cluster.
//!
//! The locator only needs two capabilities from the wire protocol: open an
//! authenticated session with an entry point, and ask that session where a
//! path lives. Framing and authentication belong to the implementation.

use crate::base::locateerror::LocateError;
use crate::locate::hostkey::HostKey;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Alias for the `Future` returned by [`Connector::connect`].
pub type Connecting = Pin<Box<dyn Future<Output = Result<Box<dyn Session>, LocateError>> + Send>>;

/// Alias for the `Future` returned by [`Session::locate`].
///
/// Resolves to the raw response text; an empty string means the cluster
/// knows no location for the path.
pub type Locating<'a> = Pin<Box<dyn Future<Output = Result<String, LocateError>> + Send + 'a>>;

/// Opens sessions with cluster entry points.
///
/// Errors must be classified: authorization failures as
/// [`LocateError::NotAuthorized`], servers of unknown type as
/// [`LocateError::UnknownServerType`], everything transient as one of the
/// retryable connection errors.
pub trait Connector: Send + Sync {
    fn connect(&self, host: &HostKey) -> Connecting;
}

/// Blanket implementation for Arc-wrapped connectors.
impl<C: Connector + ?Sized> Connector for Arc<C> {
    fn connect(&self, host: &HostKey) -> Connecting {
        (**self).connect(host)
    }
}

/// An established session with one entry point.
pub trait Session: Send + Sync + fmt::Debug {
    /// Ask where `path` is served. A protocol-level refusal is reported as
    /// [`LocateError::Rejected`].
    fn locate(&mut self, path: &str) -> Locating<'_>;
}
