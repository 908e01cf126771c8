//! In-memory location caching.
//!
//! - [`dedup`]: one shared, immutable list per distinct host set
//! - [`ttlcache`]: identifier → host list with lazy, rate-limited expiry

pub mod dedup;
pub mod ttlcache;

pub use dedup::{CanonicalList, DedupTable};
pub use ttlcache::{CacheEntry, CacheQuery, TtlCache};
