//! Pattern-based invalidation.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use glob::Pattern;
use tracing::{debug, info};

use super::CacheStore;
use crate::error::Result;
use crate::metrics::EvictionReason;

/// Outcome of an invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationResult {
    /// Number of entries removed.
    pub count: usize,
    /// Patterns that were applied.
    pub patterns: Vec<String>,
}

impl<K, T> CacheStore<K, T>
where
    K: Eq + Hash + Clone + Debug + Display + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Invalidates every entry whose key, rendered with `Display`, matches a
    /// glob pattern.
    ///
    /// For [`FallbackKey`](strata_core::FallbackKey) keys the rendering is
    /// `identity:product:client:tenant:context`, with `*` for a common
    /// dimension:
    ///
    /// - `7:*` drops every override of definition 7;
    /// - `*:*:*:5:*` drops everything cached for tenant 5.
    ///
    /// An invalid pattern matches nothing.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidState` outside the active state.
    pub fn invalidate_matching(&self, pattern_str: &str) -> Result<InvalidationResult> {
        let pattern = match Pattern::new(pattern_str) {
            Ok(p) => p,
            Err(e) => {
                debug!(store = %self.name, pattern = %pattern_str, error = %e, "Invalid glob pattern");
                self.active_check("invalidate by pattern")?;
                return Ok(InvalidationResult {
                    count: 0,
                    patterns: vec![pattern_str.to_string()],
                });
            },
        };

        let removed = {
            let mut state = self.state.write();
            let entries = self.active_entries_mut(&mut state, "invalidate by pattern")?;

            let matching: Vec<K> = entries
                .keys()
                .filter(|key| pattern.matches(&key.to_string()))
                .cloned()
                .collect();

            let removed: Vec<_> = matching
                .into_iter()
                .filter_map(|key| entries.remove(&key).map(|entry| (key, entry)))
                .collect();
            self.metrics.update_entry_count(entries.len());
            removed
        };

        let count = removed.len();
        self.dispose_all(removed, EvictionReason::Invalidated);

        info!(
            store = %self.name,
            pattern = %pattern_str,
            count = count,
            "Cache entries invalidated by pattern"
        );

        Ok(InvalidationResult {
            count,
            patterns: vec![pattern_str.to_string()],
        })
    }

    /// Invalidates several patterns, summing the removed entries.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidState` outside the active state.
    pub fn invalidate_patterns(&self, patterns: &[&str]) -> Result<InvalidationResult> {
        let mut total_count = 0;
        let mut all_patterns = Vec::new();

        for pattern_str in patterns {
            let result = self.invalidate_matching(pattern_str)?;
            total_count += result.count;
            all_patterns.extend(result.patterns);
        }

        Ok(InvalidationResult {
            count: total_count,
            patterns: all_patterns,
        })
    }
}
