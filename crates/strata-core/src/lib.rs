//! Strata Core - fallback keys and shared error types.
//!
//! This crate holds the pure side of the Strata configuration resolver:
//! the [`FallbackKey`] that describes "what is being asked for, and for whom",
//! the [`FallbackSequence`] that walks such a key from most specific to the
//! fully common default, and the error types shared with the cache runtime.
//!
//! # Example
//!
//! ```
//! use strata_core::{ContextPath, FallbackKey};
//!
//! let key = FallbackKey::new(7u64)
//!     .with_tenant(5)
//!     .with_client(3)
//!     .with_product(2)
//!     .with_context("1.10-2.20".parse::<ContextPath>().unwrap());
//!
//! let walk: Vec<_> = key.fallbacks().collect();
//! assert_eq!(walk.len(), 7);
//! assert!(walk.last().unwrap().is_common());
//! ```

pub mod build;
pub mod error;
pub mod fallback;

// Re-exports
pub use build::build_each;
pub use error::{BuildError, ContextPathError, LoadError};
pub use fallback::{
    Collapse, ContextPath, Dimension, DimensionKind, DimensionSet, FallbackKey,
    FallbackSequence, Id, PathLink, ScopedFallback, ScopedIdentity, expand,
};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }

    #[test]
    fn version_is_semver() {
        let v = version();
        assert_eq!(v.split('.').count(), 3, "Version should be semver");
    }
}
