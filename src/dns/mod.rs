//! Reverse DNS Resolution Module
//!
//! Turns node addresses reported by a cluster into canonical hostnames:
//! - Async hickory-dns PTR lookups
//! - Numeric rendering (no lookup)
//! - Address-to-hostname override mechanism
//!
//! # Example
//!
//! ```rust,ignore
//! use xrdsites::dns::{HickoryReverseResolver, ReverseResolve};
//!
//! let resolver = HickoryReverseResolver::new();
//! let host = resolver.reverse("10.0.0.5".parse()?).await?;
//! println!("Resolved: {}", host);
//! ```

mod hickory;
mod numeric;
mod resolve;

pub use hickory::HickoryReverseResolver;
pub use numeric::NumericResolver;
pub use resolve::{ReverseResolve, ReverseResolverWithOverrides, Reversing};
