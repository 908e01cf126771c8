//! Registry of remote locators, one per entry point.

use crate::base::locateerror::LocateError;
use crate::dns::ReverseResolve;
use crate::locate::hostkey::HostKey;
use crate::locate::locator::{LocatorStatus, RemoteLocator};
use crate::locate::retry::RetryConfig;
use crate::locate::transport::Connector;
use dashmap::DashMap;
use std::sync::Arc;

/// Maps entry points to their long-lived [`RemoteLocator`].
///
/// Locators are created lazily on first use and live as long as the
/// registry. Every spelling of an entry point that normalizes to the same
/// [`HostKey`] shares one locator.
pub struct ResolverRegistry {
    locators: Arc<DashMap<HostKey, Arc<RemoteLocator>>>,
    connector: Arc<dyn Connector>,
    resolver: Arc<dyn ReverseResolve>,
    retry: RetryConfig,
    default_port: u16,
}

impl Clone for ResolverRegistry {
    fn clone(&self) -> Self {
        Self {
            locators: Arc::clone(&self.locators),
            connector: Arc::clone(&self.connector),
            resolver: Arc::clone(&self.resolver),
            retry: self.retry.clone(),
            default_port: self.default_port,
        }
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("locators", &self.locators.len())
            .field("retry", &self.retry)
            .field("default_port", &self.default_port)
            .finish()
    }
}

impl ResolverRegistry {
    pub fn new(
        connector: Arc<dyn Connector>,
        resolver: Arc<dyn ReverseResolve>,
        retry: RetryConfig,
        default_port: u16,
    ) -> Self {
        Self {
            locators: Arc::new(DashMap::new()),
            connector,
            resolver,
            retry,
            default_port,
        }
    }

    /// Get the locator for an entry point string, creating it if needed.
    pub fn get_resolver(&self, entry_point: &str) -> Result<Arc<RemoteLocator>, LocateError> {
        let key = HostKey::parse(entry_point, self.default_port)?;
        Ok(self.get(&key))
    }

    /// Get the locator for a normalized key, creating it if needed.
    pub fn get(&self, key: &HostKey) -> Arc<RemoteLocator> {
        if let Some(locator) = self.locators.get(key) {
            return Arc::clone(&locator);
        }

        let locator = self.locators.entry(key.clone()).or_insert_with(|| {
            tracing::debug!(host = %key, "creating remote locator");
            Arc::new(RemoteLocator::new(
                key.clone(),
                Arc::clone(&self.connector),
                Arc::clone(&self.resolver),
                self.retry.clone(),
            ))
        });
        Arc::clone(&locator)
    }

    /// Status of every registered locator, ordered by host.
    pub fn snapshot(&self) -> Vec<LocatorStatus> {
        let locators: Vec<Arc<RemoteLocator>> =
            self.locators.iter().map(|entry| Arc::clone(entry.value())).collect();

        let mut statuses: Vec<LocatorStatus> = locators.iter().map(|l| l.status()).collect();
        statuses.sort_by(|a, b| a.host.to_string().cmp(&b.host.to_string()));
        statuses
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::connstate::ConnectionState;
    use crate::dns::NumericResolver;
    use crate::locate::transport::Connecting;

    struct RefusingConnector;

    impl Connector for RefusingConnector {
        fn connect(&self, host: &HostKey) -> Connecting {
            let host = host.to_string();
            Box::pin(async move {
                Err(LocateError::ConnectionFailed {
                    host,
                    reason: "refused".to_string(),
                })
            })
        }
    }

    fn registry() -> ResolverRegistry {
        ResolverRegistry::new(
            Arc::new(RefusingConnector),
            Arc::new(NumericResolver::new()),
            RetryConfig::no_retry(),
            1094,
        )
    }

    #[test]
    fn test_same_entry_point_shares_locator() {
        let registry = registry();
        let a = registry.get_resolver("Redirector.example.org").unwrap();
        let b = registry.get_resolver("root://redirector.example.org:1094").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_ports_get_distinct_locators() {
        let registry = registry();
        let a = registry.get_resolver("redirector.example.org:1094").unwrap();
        let b = registry.get_resolver("redirector.example.org:2094").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_invalid_entry_point() {
        let registry = registry();
        assert!(matches!(
            registry.get_resolver(""),
            Err(LocateError::InvalidHost(_))
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_reports_failure() {
        let registry = registry();
        let locator = registry.get_resolver("b.example.org").unwrap();
        registry.get_resolver("a.example.org").unwrap();

        assert!(locator.locate("/store/f1").await.is_err());

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].host.host(), "a.example.org");
        assert_eq!(snapshot[0].state, ConnectionState::Disconnected);
        assert!(snapshot[0].last_error.is_none());
        assert_eq!(snapshot[1].state, ConnectionState::Failed);
        assert!(snapshot[1].last_error.is_some());
    }
}
