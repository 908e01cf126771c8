//! Canonical result lists shared across cache entries.
//!
//! Identical host sets recur across many files, so every distinct set is
//! stored once and handed out as an `Arc`. The table only grows; its size is
//! bounded by the number of distinct host sets ever observed.

use dashmap::DashMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Separator used when joining sorted hostnames into a hash.
const HASH_SEPARATOR: char = ',';

/// Immutable, sorted, shared representation of a host set.
#[derive(PartialEq, Eq)]
pub struct CanonicalList {
    hash: String,
    hosts: Box<[String]>,
}

impl CanonicalList {
    fn new(hash: String, hosts: BTreeSet<String>) -> Self {
        Self {
            hash,
            hosts: hosts.into_iter().collect(),
        }
    }

    /// Canonical hash: the sorted hostnames joined with a separator.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Hostnames in lexicographic order.
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn contains(&self, host: &str) -> bool {
        self.hosts
            .binary_search_by(|h| h.as_str().cmp(host))
            .is_ok()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.hosts.iter()
    }

    /// Compute the canonical hash of a sorted host set.
    pub fn hash_of(hosts: &BTreeSet<String>) -> String {
        let mut hash = String::with_capacity(hosts.iter().map(|h| h.len() + 1).sum());
        for (i, host) in hosts.iter().enumerate() {
            if i > 0 {
                hash.push(HASH_SEPARATOR);
            }
            hash.push_str(host);
        }
        hash
    }
}

impl fmt::Debug for CanonicalList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.hosts.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a CanonicalList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.hosts.iter()
    }
}

/// Thread-safe table of canonical result lists, keyed by hash.
#[derive(Clone)]
pub struct DedupTable {
    lists: Arc<DashMap<String, Arc<CanonicalList>>>,
}

impl Default for DedupTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self {
            lists: Arc::new(DashMap::new()),
        }
    }

    /// Return the stored list for `hosts`, creating it on first sight.
    ///
    /// Empty hostnames are dropped.
    ///
    /// Check-and-create runs under the entry lock for the hash, so concurrent
    /// callers racing on the same host set all receive the same instance.
    pub fn get_or_create<I, S>(&self, hosts: I) -> Arc<CanonicalList>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hosts: BTreeSet<String> = hosts
            .into_iter()
            .map(Into::into)
            .filter(|host: &String| !host.is_empty())
            .collect();
        let hash = CanonicalList::hash_of(&hosts);

        if let Some(existing) = self.lists.get(&hash) {
            return Arc::clone(existing.value());
        }

        let entry = self
            .lists
            .entry(hash.clone())
            .or_insert_with(|| Arc::new(CanonicalList::new(hash, hosts)));
        Arc::clone(entry.value())
    }

    /// Union `additional` into the hosts of `existing` without touching it.
    ///
    /// Callers may still hold `existing`; the result is a new or reused list.
    pub fn merge_into<I, S>(&self, existing: &Arc<CanonicalList>, additional: I) -> Arc<CanonicalList>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut additional = additional.into_iter().peekable();
        if additional.peek().is_none() {
            return Arc::clone(existing);
        }

        let merged = existing
            .hosts()
            .iter()
            .cloned()
            .chain(additional.map(Into::into));
        self.get_or_create(merged)
    }

    /// The canonical empty list.
    pub fn empty(&self) -> Arc<CanonicalList> {
        self.get_or_create(std::iter::empty::<String>())
    }

    /// Number of distinct host sets stored.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

impl fmt::Debug for DedupTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedupTable")
            .field("distinct_sets", &self.lists.len())
            .finish()
    }
}
