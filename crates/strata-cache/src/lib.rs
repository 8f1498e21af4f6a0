//! Strata Cache - load-through caching for configuration definitions.
//!
//! This crate provides the runtime side of the Strata resolver:
//!
//! - [`CacheStore`]: a per-resource-type cache that loads missing or stale
//!   entries through a [`Source`], with revalidation of unmodified values
//!   and optional memoization of empty results and failures.
//! - [`DormantSweeper`]: the single background task that evicts entries
//!   nobody has read for a while.
//! - [`ConfigResolver`]: walks a [`FallbackKey`](strata_core::FallbackKey)
//!   from most to least specific and probes a store at each step.
//!
//! Behavior is described by a [`CachePolicy`], usually built from
//! [`CacheSettings`] loaded from a file and `STRATA_CACHE__*` environment
//! variables.

pub mod entry;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod resolver;
pub mod settings;
pub mod source;
pub mod store;
pub mod sweeper;

// Re-exports
pub use entry::{CacheEntry, Outcome, OutcomeKind};
pub use error::{CacheError, Lifecycle, Result};
pub use metrics::{CacheMetrics, EvictionReason, register_cache_metrics};
pub use policy::{CachePolicy, CachePolicyBuilder, MIN_SWEEP_INTERVAL};
pub use resolver::{ConfigResolver, Resolved};
pub use settings::CacheSettings;
pub use source::Source;
pub use store::{CacheStore, EntryDump, InvalidationResult, StoreDump};
pub use sweeper::{DormantSweeper, RegistrationId, SweepReport, Sweepable, SweeperHandle};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
