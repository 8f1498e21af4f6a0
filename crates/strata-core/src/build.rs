//! Batch construction of domain values from raw definitions.

use tracing::warn;

use crate::error::BuildError;

/// Builds every raw definition, skipping the ones that fail.
///
/// A malformed definition must not take the whole batch down with it: each
/// failure is logged with its item and reason, and the remaining definitions
/// are still built. The output keeps the input order.
///
/// # Example
///
/// ```
/// use strata_core::{BuildError, build_each};
///
/// let raw = vec!["10", "x", "30"];
/// let built: Vec<u32> = build_each("page", raw, |s| {
///     s.parse().map_err(|_| BuildError::new(format!("page {s}"), "not a number"))
/// });
/// assert_eq!(built, vec![10, 30]);
/// ```
pub fn build_each<R, T, F>(kind: &str, raw: impl IntoIterator<Item = R>, mut build: F) -> Vec<T>
where
    F: FnMut(R) -> Result<T, BuildError>,
{
    let mut built = Vec::new();
    let mut skipped = 0usize;

    for definition in raw {
        match build(definition) {
            Ok(value) => built.push(value),
            Err(e) => {
                skipped += 1;
                warn!(kind = %kind, item = %e.item, reason = %e.reason, "Skipping definition");
            },
        }
    }

    if skipped > 0 {
        warn!(
            kind = %kind,
            built = built.len(),
            skipped = skipped,
            "Some definitions could not be built"
        );
    }

    built
}
