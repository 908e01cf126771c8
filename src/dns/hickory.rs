//! PTR lookups through hickory-dns.

use super::resolve::canonical_name;
use super::{ReverseResolve, Reversing};
use crate::base::locateerror::LocateError;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use std::{net::IpAddr, sync::LazyLock};

/// PTR resolver backed by hickory-dns.
///
/// Every instance shares one process-wide resolver, built from the system
/// configuration on first use.
///
/// # Example
///
/// ```rust,ignore
/// use xrdsites::dns::{HickoryReverseResolver, ReverseResolve};
///
/// let resolver = HickoryReverseResolver::new();
/// let host = resolver.reverse("10.0.0.5".parse()?).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HickoryReverseResolver {
    resolver: &'static LazyLock<TokioResolver>,
}

static SHARED: LazyLock<TokioResolver> = LazyLock::new(build_resolver);

fn build_resolver() -> TokioResolver {
    let builder = TokioResolver::builder_tokio().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "no usable system resolver config, falling back to defaults");
        TokioResolver::builder_with_config(
            ResolverConfig::default(),
            TokioConnectionProvider::default(),
        )
    });
    builder.build()
}

impl HickoryReverseResolver {
    pub fn new() -> Self {
        Self { resolver: &SHARED }
    }
}

impl Default for HickoryReverseResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReverseResolve for HickoryReverseResolver {
    fn reverse(&self, ip: IpAddr) -> Reversing {
        let resolver = self.resolver;
        Box::pin(async move {
            let addr = ip.to_string();
            tracing::debug!(addr = %addr, "issuing PTR lookup");

            let lookup = resolver
                .reverse_lookup(ip)
                .await
                .map_err(|e| LocateError::NameNotResolvedFor {
                    addr: addr.clone(),
                    reason: e.to_string(),
                })?;

            let name = lookup
                .iter()
                .next()
                .map(|ptr| canonical_name(&ptr.to_string()))
                .filter(|name| !name.is_empty())
                .ok_or_else(|| LocateError::NameNotResolvedFor {
                    addr: addr.clone(),
                    reason: "empty PTR answer".to_string(),
                })?;

            tracing::debug!(addr = %addr, host = %name, "PTR lookup complete");
            Ok(name)
        })
    }
}
