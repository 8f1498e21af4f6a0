//! Hierarchical fallback keys.
//!
//! A configuration override may be defined for a specific context instance,
//! tenant, client or product, or for none of them. A lookup starts at the
//! most specific key the caller can describe and falls back one dimension at
//! a time until it reaches the common key:
//!
//! 1. context path: innermost concrete instance replaced by its template,
//!    repeatedly, then dropped altogether
//! 2. tenant
//! 3. client
//! 4. product

mod context_path;
mod dimension;
mod key;
mod scoped;
mod sequence;

pub use context_path::{ContextPath, PathLink};
pub use dimension::{Dimension, DimensionKind, DimensionSet, Id};
pub use key::{Collapse, FallbackKey};
pub use scoped::{ScopedFallback, ScopedIdentity};
pub use sequence::{FallbackSequence, expand};
