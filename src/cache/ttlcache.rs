//! Time-limited cache of file locations.
//!
//! Maps a file identifier to the canonical host list it was last resolved to.
//! Expired entries are evicted lazily: every query attempts a prune, and a
//! prune only sweeps when the prune interval has elapsed since the last
//! sweep. There is no background task.

use crate::cache::dedup::{CanonicalList, DedupTable};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Default lifetime of a cache entry (15 minutes).
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(15 * 60);

/// Minimum interval between two prune sweeps.
pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// A cached resolution for one identifier.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    identifier: String,
    hosts: Arc<CanonicalList>,
    expires_at: Instant,
}

impl CacheEntry {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn hosts(&self) -> &Arc<CanonicalList> {
        &self.hosts
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Check if the entry is still live at `now`.
    pub fn is_valid(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Result of a cache query: hosts of every hit, identifiers that missed.
#[derive(Debug, Clone)]
pub struct CacheQuery {
    pub hosts: Arc<CanonicalList>,
    pub remaining: Vec<String>,
}

impl CacheQuery {
    /// True when every identifier was answered from the cache.
    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }
}

struct State {
    entries: HashMap<String, CacheEntry>,
    last_prune: Instant,
}

/// Thread-safe TTL cache of identifier → host list mappings.
pub struct TtlCache {
    state: Mutex<State>,
    dedup: DedupTable,
    lifetime: Duration,
    prune_interval: Duration,
}

impl TtlCache {
    /// Create a cache with the default lifetime and prune interval.
    pub fn new(dedup: DedupTable) -> Self {
        Self::with_limits(dedup, DEFAULT_LIFETIME, DEFAULT_PRUNE_INTERVAL)
    }

    /// Create a cache with custom lifetime and prune interval.
    pub fn with_limits(dedup: DedupTable, lifetime: Duration, prune_interval: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                entries: HashMap::new(),
                last_prune: Instant::now(),
            }),
            dedup,
            lifetime,
            prune_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The deduplication table backing this cache.
    pub fn dedup(&self) -> &DedupTable {
        &self.dedup
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Store the hosts serving `identifier`, replacing any previous entry.
    pub fn insert<I, S>(&self, identifier: impl Into<String>, hosts: I) -> Arc<CanonicalList>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let identifier = identifier.into();
        let hosts = self.dedup.get_or_create(hosts);
        let expires_at = Instant::now() + self.lifetime;

        tracing::debug!(
            identifier = %identifier,
            hosts = hosts.len(),
            "caching file location"
        );

        let entry = CacheEntry {
            identifier: identifier.clone(),
            hosts: Arc::clone(&hosts),
            expires_at,
        };
        self.lock().entries.insert(identifier, entry);
        hosts
    }

    /// Partition `identifiers` into cache hits and misses.
    ///
    /// Hosts of every live entry are folded into one canonical list. The
    /// partition is taken under a single lock acquisition.
    pub fn query<S: AsRef<str>>(&self, identifiers: &[S]) -> CacheQuery {
        let now = Instant::now();
        self.prune(now);

        let mut hosts = BTreeSet::new();
        let mut remaining = Vec::new();
        {
            let state = self.lock();
            for identifier in identifiers {
                let identifier = identifier.as_ref();
                match state.entries.get(identifier) {
                    Some(entry) if entry.is_valid(now) => {
                        hosts.extend(entry.hosts.iter().cloned());
                    }
                    _ => remaining.push(identifier.to_string()),
                }
            }
        }

        CacheQuery {
            hosts: self.dedup.get_or_create(hosts),
            remaining,
        }
    }

    /// Evict expired entries, at most once per prune interval.
    ///
    /// Returns the number of evicted entries.
    pub fn prune(&self, now: Instant) -> usize {
        let mut state = self.lock();

        if now.saturating_duration_since(state.last_prune) < self.prune_interval {
            return 0;
        }

        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_valid(now));
        state.last_prune = now;

        let evicted = before - state.entries.len();
        tracing::debug!(evicted, remaining = state.entries.len(), "pruned location cache");
        evicted
    }

    /// Look up a live entry without pruning.
    pub fn get(&self, identifier: &str) -> Option<CacheEntry> {
        let now = Instant::now();
        self.lock()
            .entries
            .get(identifier)
            .filter(|entry| entry.is_valid(now))
            .cloned()
    }

    /// Whether `identifier` has an entry that has not expired.
    pub fn contains_live(&self, identifier: &str) -> bool {
        self.get(identifier).is_some()
    }

    /// Number of stored entries, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

impl std::fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.len())
            .field("lifetime", &self.lifetime)
            .field("prune_interval", &self.prune_interval)
            .finish()
    }
}
