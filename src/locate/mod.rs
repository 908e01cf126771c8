//! Remote location of files on a storage cluster.
//!
//! - [`registry`]: one [`RemoteLocator`] per cluster entry point
//! - [`locator`]: connection state machine and deadline-bounded locate
//! - [`descriptor`]: node descriptor parsing and hostname normalization
//! - [`transport`]: the wire capability a locator drives, with a TCP
//!   line-protocol implementation in [`tcp`]

pub mod config;
pub mod descriptor;
pub mod hostkey;
pub mod locator;
pub mod registry;
pub mod retry;
pub mod tcp;
pub mod transport;

pub use config::LocateConfig;
pub use descriptor::{NodeDescriptor, NodeRole};
pub use hostkey::HostKey;
pub use locator::{LocateOutcome, LocatorStatus, RemoteLocator};
pub use registry::ResolverRegistry;
pub use retry::{AttemptOutcome, RetryConfig};
pub use tcp::{TcpConnector, TcpSession};
pub use transport::{Connecting, Connector, Locating, Session};
