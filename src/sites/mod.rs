//! File-to-site resolution.
//!
//! Ties the location cache to the remote locators: cached identifiers are
//! answered locally, the rest are located against the cluster under a short
//! deadline, and the answers are folded into one shared host list.

mod resolver;

pub use resolver::SiteResolver;
