//! Core reverse resolution types and traits.
//!
//! This module defines the `ReverseResolve` trait and supporting types that
//! turn node addresses reported by a cluster into canonical hostnames.

use crate::base::locateerror::LocateError;
use std::{collections::HashMap, fmt, future::Future, net::IpAddr, pin::Pin, sync::Arc};

/// Alias for the `Future` type returned by a reverse resolver.
pub type Reversing = Pin<Box<dyn Future<Output = Result<String, LocateError>> + Send>>;

/// Trait for reverse (address-to-name) resolution.
///
/// Implementations must be thread-safe; a single resolver is shared by every
/// locator in the process.
pub trait ReverseResolve: Send + Sync {
    /// Resolves an IP address to a canonical hostname.
    ///
    /// The returned name carries no trailing dot.
    fn reverse(&self, ip: IpAddr) -> Reversing;
}

/// Blanket implementation for Arc-wrapped resolvers.
impl<R: ReverseResolve + ?Sized> ReverseResolve for Arc<R> {
    fn reverse(&self, ip: IpAddr) -> Reversing {
        (**self).reverse(ip)
    }
}

/// Strip the root label and normalize case of a resolved name.
pub(crate) fn canonical_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Reverse resolver wrapper that supports address overrides.
///
/// This resolver first checks a map of address-to-hostname overrides before
/// falling back to the underlying resolver. Useful for:
/// - Testing without real DNS
/// - Nodes without PTR records
///
/// # Example
///
/// ```rust,ignore
/// use xrdsites::dns::{HickoryReverseResolver, ReverseResolverWithOverrides};
/// use std::collections::HashMap;
///
/// let mut overrides = HashMap::new();
/// overrides.insert("10.0.0.5".parse().unwrap(), "node5.example.org".to_string());
///
/// let resolver = ReverseResolverWithOverrides::new(
///     Arc::new(HickoryReverseResolver::new()),
///     overrides,
/// );
/// ```
pub struct ReverseResolverWithOverrides {
    inner: Arc<dyn ReverseResolve>,
    overrides: Arc<HashMap<IpAddr, String>>,
}

impl ReverseResolverWithOverrides {
    /// Creates a new resolver with the given overrides.
    ///
    /// # Arguments
    ///
    /// * `inner` - The fallback resolver for non-overridden addresses.
    /// * `overrides` - Map of addresses to their hostnames.
    pub fn new(inner: Arc<dyn ReverseResolve>, overrides: HashMap<IpAddr, String>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(ip, name)| (ip, canonical_name(&name)))
            .collect();
        Self {
            inner,
            overrides: Arc::new(overrides),
        }
    }

    /// Returns the number of configured overrides.
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

impl ReverseResolve for ReverseResolverWithOverrides {
    fn reverse(&self, ip: IpAddr) -> Reversing {
        if let Some(name) = self.overrides.get(&ip) {
            return Box::pin(std::future::ready(Ok(name.clone())));
        }
        self.inner.reverse(ip)
    }
}

impl fmt::Debug for ReverseResolverWithOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReverseResolverWithOverrides")
            .field("override_count", &self.overrides.len())
            .finish_non_exhaustive()
    }
}
