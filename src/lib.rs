//! # xrdsites
//!
//! Resolves file identifiers to the storage hosts currently serving them.
//!
//! `xrdsites` sits on a latency-sensitive decision path: a caller asks which
//! sites hold a set of files and must get an answer within a few tens of
//! milliseconds, even when the cluster is slow. Answers are cached with a
//! time-to-live, and identical host sets share one stored list.
//!
//! ## Features
//!
//! - **TTL Cache**: 15 minute entries, lazy rate-limited pruning
//! - **Deduplication**: one `Arc` per distinct host set
//! - **Remote Locators**: one connection per cluster entry point, with
//!   bounded retries
//! - **Bounded Wait**: 50 ms default deadline, late answers still cached
//! - **Normalization**: node descriptors reverse-resolved to hostnames
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use xrdsites::locate::LocateConfig;
//! use xrdsites::sites::SiteResolver;
//!
//! #[tokio::main]
//! async fn main() {
//!     let resolver = SiteResolver::new(LocateConfig::from_env()).unwrap();
//!     let sites = resolver
//!         .files_to_sites("redirector.example.org", &["/store/f1"])
//!         .await
//!         .unwrap();
//!     println!("Sites: {:?}", sites.hosts());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error and connection state types
//! - [`cache`] - TTL cache and host list deduplication
//! - [`dns`] - Reverse name resolution
//! - [`locate`] - Remote locators, transports and configuration
//! - [`sites`] - The resolution entry point

pub mod base;
pub mod cache;
pub mod dns;
pub mod locate;
pub mod sites;
