//! Reverse resolver that performs no lookups.
//!
//! Renders the address itself as the hostname. Useful for clusters whose
//! data servers have no PTR records, or when DNS must stay off the request
//! path entirely.

use super::{ReverseResolve, Reversing};
use std::net::IpAddr;

/// Resolver returning the textual form of the address.
///
/// IPv4 addresses render as dotted quads, IPv6 addresses in their
/// compressed form, so `::ffff:10.0.0.5` and `10.0.0.5` stay distinct.
#[derive(Clone, Debug, Default)]
pub struct NumericResolver;

impl NumericResolver {
    /// Creates a new `NumericResolver`.
    pub fn new() -> Self {
        Self
    }
}

impl ReverseResolve for NumericResolver {
    fn reverse(&self, ip: IpAddr) -> Reversing {
        Box::pin(std::future::ready(Ok(ip.to_string())))
    }
}
