//! The fallback walk over a [`FallbackKey`].

use std::iter::FusedIterator;

use super::dimension::DimensionSet;
use super::key::FallbackKey;

/// Iterator over a key and all of its less specific fallbacks.
///
/// Yields the starting key first, then each [`FallbackKey::parent`] in
/// turn, and ends after the fully common key. Every step changes exactly one
/// dimension, so no key is yielded twice and the walk is exactly
/// `specificity + 1` keys long.
///
/// # Example
///
/// ```
/// use strata_core::{FallbackKey, FallbackSequence};
///
/// let key = FallbackKey::new(7u64).with_tenant(5).with_client(3);
/// let walk: Vec<String> = FallbackSequence::new(key).map(|k| k.to_string()).collect();
/// assert_eq!(walk, vec!["7:*:3:5:*", "7:*:3:*:*", "7:*:*:*:*"]);
/// ```
#[derive(Debug, Clone)]
pub struct FallbackSequence<I> {
    next: Option<FallbackKey<I>>,
}

impl<I: Clone> FallbackSequence<I> {
    /// Starts a walk at `key`, using every dimension it carries.
    pub fn new(key: FallbackKey<I>) -> Self {
        Self { next: Some(key) }
    }

    /// Starts a walk at `key`, ignoring dimensions outside `dimensions`.
    pub fn with_dimensions(key: FallbackKey<I>, dimensions: DimensionSet) -> Self {
        Self::new(key.restrict(dimensions))
    }

    /// Returns the key the next call to `next` will yield.
    pub fn peek(&self) -> Option<&FallbackKey<I>> {
        self.next.as_ref()
    }
}

/// Expands a key into its full fallback sequence, most specific first.
pub fn expand<I: Clone>(key: FallbackKey<I>) -> Vec<FallbackKey<I>> {
    FallbackSequence::new(key).collect()
}

impl<I: Clone> Iterator for FallbackSequence<I> {
    type Item = FallbackKey<I>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.next.as_ref().map_or(0, |k| k.specificity() + 1);
        (remaining, Some(remaining))
    }
}

impl<I: Clone> ExactSizeIterator for FallbackSequence<I> {}

impl<I: Clone> FusedIterator for FallbackSequence<I> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::{ContextPath, Dimension, DimensionKind};

    fn scenario_key() -> FallbackKey<u64> {
        FallbackKey::new(7)
            .with_tenant(5)
            .with_client(3)
            .with_product(2)
            .with_context("1.10-2.20".parse::<ContextPath>().unwrap())
    }

    #[test]
    fn test_full_walk() {
        let walk: Vec<String> = FallbackSequence::new(scenario_key())
            .map(|k| k.to_string())
            .collect();

        assert_eq!(
            walk,
            vec![
                "7:2:3:5:1.10-2.20",
                "7:2:3:5:1.0-2.20",
                "7:2:3:5:1.0-2.0",
                "7:2:3:5:*",
                "7:2:3:*:*",
                "7:2:*:*:*",
                "7:*:*:*:*",
            ]
        );
    }

    #[test]
    fn test_exact_size() {
        let mut walk = FallbackSequence::new(scenario_key());
        assert_eq!(walk.len(), 7);
        walk.next();
        walk.next();
        assert_eq!(walk.len(), 5);
        walk.by_ref().for_each(drop);
        assert_eq!(walk.len(), 0);
        assert!(walk.next().is_none());
    }

    #[test]
    fn test_common_key_yields_itself_once() {
        let walk = expand(FallbackKey::new(1u64));
        assert_eq!(walk, vec![FallbackKey::new(1u64)]);
    }

    #[test]
    fn test_root_context_is_cleared_in_one_step() {
        let key = FallbackKey::new(1u64).with_context("4.0".parse().unwrap());
        let walk = expand(key);
        assert_eq!(walk.len(), 2);
        assert!(walk[1].is_common());
    }

    #[test]
    fn test_with_dimensions() {
        let dims = DimensionSet::all()
            .without(DimensionKind::Context)
            .without(DimensionKind::Client);
        let walk: Vec<_> = FallbackSequence::with_dimensions(scenario_key(), dims).collect();

        assert_eq!(walk.len(), 3);
        assert_eq!(walk[0].tenant(), Dimension::Specific(5));
        assert_eq!(walk[0].client(), Dimension::Common);
        assert!(walk[0].context().is_none());
        assert!(walk[2].is_common());
    }

    #[test]
    fn test_peek() {
        let mut walk = FallbackSequence::new(scenario_key());
        assert_eq!(walk.peek(), Some(&scenario_key()));
        walk.next();
        assert_eq!(walk.peek().unwrap().to_string(), "7:2:3:5:1.0-2.20");
    }
}
