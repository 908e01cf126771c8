use crate::base::locateerror::LocateError;
use crate::cache::{CanonicalList, DedupTable, TtlCache};
use crate::dns::{HickoryReverseResolver, ReverseResolve};
use crate::locate::config::LocateConfig;
use crate::locate::hostkey::HostKey;
use crate::locate::locator::LocateOutcome;
use crate::locate::registry::ResolverRegistry;
use crate::locate::retry::RetryConfig;
use crate::locate::tcp::TcpConnector;
use crate::locate::transport::Connector;
use futures::future::join_all;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Resolves file identifiers to the hosts serving them.
///
/// One instance is meant to be shared by the whole process; clones share the
/// cache and the locator registry.
///
/// # Example
///
/// ```rust,ignore
/// use xrdsites::locate::LocateConfig;
/// use xrdsites::sites::SiteResolver;
///
/// let resolver = SiteResolver::new(LocateConfig::from_env())?;
/// let sites = resolver
///     .files_to_sites("redirector.example.org", &["/store/f1", "/store/f2"])
///     .await?;
/// for host in sites.iter() {
///     println!("{}", host);
/// }
/// ```
#[derive(Clone)]
pub struct SiteResolver {
    cache: Arc<TtlCache>,
    registry: ResolverRegistry,
    config: LocateConfig,
}

impl std::fmt::Debug for SiteResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteResolver")
            .field("cache", &self.cache)
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

impl SiteResolver {
    /// Create a resolver speaking the TCP line protocol, with hostnames
    /// taken from reverse DNS.
    pub fn new(config: LocateConfig) -> Result<Self, LocateError> {
        Self::with_parts(
            config,
            Arc::new(TcpConnector::new()),
            Arc::new(HickoryReverseResolver::new()),
        )
    }

    /// Create a resolver with a custom transport and reverse resolver.
    pub fn with_parts(
        config: LocateConfig,
        connector: Arc<dyn Connector>,
        resolver: Arc<dyn ReverseResolve>,
    ) -> Result<Self, LocateError> {
        config.validate()?;

        let cache = TtlCache::with_limits(
            DedupTable::new(),
            config.lifetime_duration(),
            config.prune_interval(),
        );
        let registry = ResolverRegistry::new(
            connector,
            resolver,
            RetryConfig::from(&config),
            config.default_port,
        );

        Ok(Self {
            cache: Arc::new(cache),
            registry,
            config,
        })
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    pub fn config(&self) -> &LocateConfig {
        &self.config
    }

    /// Resolve `identifiers` to the union of the hosts serving them.
    ///
    /// Cached identifiers are answered locally. The others are located
    /// against `entry_point` concurrently, each waiting at most the configured
    /// locate timeout; answers that arrive later still land in the cache for
    /// the next call. Identifiers that fail or time out are left out of the
    /// result, so a partial answer is still `Ok`.
    pub async fn files_to_sites<S: AsRef<str>>(
        &self,
        entry_point: &str,
        identifiers: &[S],
    ) -> Result<Arc<CanonicalList>, LocateError> {
        let key = HostKey::parse(entry_point, self.config.default_port)?;

        let query = self.cache.query(identifiers);
        if query.is_complete() {
            tracing::debug!(host = %key, identifiers = identifiers.len(), "all locations cached");
            return Ok(query.hosts);
        }

        let locator = self.registry.get(&key);
        let deadline = self.config.locate_timeout_duration();
        tracing::debug!(
            host = %key,
            cached = identifiers.len() - query.remaining.len(),
            missing = query.remaining.len(),
            "locating uncached files"
        );

        let mut queued = HashSet::new();
        let missing = query
            .remaining
            .iter()
            .filter(|identifier| queued.insert(identifier.as_str()));

        let lookups = missing.map(|identifier| {
            let locator = &locator;
            let cache = Arc::clone(&self.cache);
            let late_identifier = identifier.clone();
            async move {
                let outcome = locator
                    .locate_within(identifier.as_str(), deadline, move |result| match result {
                        Ok(hosts) => {
                            cache.insert(late_identifier, hosts);
                        }
                        Err(e) => {
                            tracing::debug!(identifier = %late_identifier, error = %e, "late locate failed");
                        }
                    })
                    .await;
                (identifier, outcome)
            }
        });

        let mut located = BTreeSet::new();
        for (identifier, outcome) in join_all(lookups).await {
            match outcome {
                LocateOutcome::Ready(hosts) => {
                    located.extend(hosts.iter().cloned());
                    self.cache.insert(identifier.clone(), hosts);
                }
                LocateOutcome::Failed(e) => {
                    tracing::warn!(host = %key, identifier = %identifier, error = %e, "locate failed");
                }
                LocateOutcome::Pending => {
                    tracing::debug!(host = %key, identifier = %identifier, "locate still pending");
                }
            }
        }

        Ok(self.cache.dedup().merge_into(&query.hosts, located))
    }
}
