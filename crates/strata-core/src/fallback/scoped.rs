//! Two-pass fallback walk for resources with an extra scope dimension.

use std::fmt;
use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use super::dimension::Dimension;
use super::key::FallbackKey;
use super::sequence::FallbackSequence;

/// An identity that can additionally be overridden per scope, such as a
/// service method overridable per application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopedIdentity<I, S> {
    /// The identity being looked up.
    pub identity: I,
    /// The scope the override applies to.
    pub scope: Dimension<S>,
}

impl<I, S> ScopedIdentity<I, S> {
    /// Creates a scoped identity.
    pub fn new(identity: I, scope: Dimension<S>) -> Self {
        Self { identity, scope }
    }
}

impl<I: fmt::Display, S: fmt::Display> fmt::Display for ScopedIdentity<I, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identity, self.scope)
    }
}

/// Walks a key twice: once with the scope specific, then again from the
/// original key with the scope common.
///
/// When the scope is already common there is a single pass. A key of
/// specificity `n` with a specific scope therefore yields `2 * (n + 1)` keys.
///
/// # Example
///
/// ```
/// use strata_core::{Dimension, FallbackKey, ScopedFallback};
///
/// let key = FallbackKey::new("getOrders").with_tenant(5);
/// let walk: Vec<String> = ScopedFallback::new(key, Dimension::Specific("billing"))
///     .map(|k| k.to_string())
///     .collect();
///
/// assert_eq!(
///     walk,
///     vec![
///         "getOrders@billing:*:*:5:*",
///         "getOrders@billing:*:*:*:*",
///         "getOrders@*:*:*:5:*",
///         "getOrders@*:*:*:*:*",
///     ]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ScopedFallback<I, S> {
    current: FallbackSequence<ScopedIdentity<I, S>>,
    unscoped: Option<FallbackKey<ScopedIdentity<I, S>>>,
}

impl<I: Clone, S: Clone> ScopedFallback<I, S> {
    /// Starts a scoped walk at `key`.
    pub fn new(key: FallbackKey<I>, scope: Dimension<S>) -> Self {
        let unscoped = scope
            .is_specific()
            .then(|| key.clone().map_identity(|id| ScopedIdentity::new(id, Dimension::Common)));
        let scoped = key.map_identity(|id| ScopedIdentity::new(id, scope));

        Self {
            current: FallbackSequence::new(scoped),
            unscoped,
        }
    }
}

impl<I: Clone, S: Clone> Iterator for ScopedFallback<I, S> {
    type Item = FallbackKey<ScopedIdentity<I, S>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(key) = self.current.next() {
            return Some(key);
        }
        let second = self.unscoped.take()?;
        self.current = FallbackSequence::new(second);
        self.current.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let pending = self.unscoped.as_ref().map_or(0, |k| k.specificity() + 1);
        let remaining = self.current.len() + pending;
        (remaining, Some(remaining))
    }
}

impl<I: Clone, S: Clone> ExactSizeIterator for ScopedFallback<I, S> {}

impl<I: Clone, S: Clone> FusedIterator for ScopedFallback<I, S> {}
