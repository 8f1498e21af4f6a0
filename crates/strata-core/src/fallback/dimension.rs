//! Override dimensions and per-resource dimension selection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric identifier used by the tenant, client and product dimensions.
pub type Id = u64;

/// One overridable dimension of a [`FallbackKey`](super::FallbackKey).
///
/// `Common` is the wildcard: "no override on this dimension". It replaces
/// the zero / empty / `"void"` sentinels that usually stand in for it.
///
/// # Example
///
/// ```
/// use strata_core::Dimension;
///
/// let tenant = Dimension::Specific(5u64);
/// assert!(tenant.is_specific());
/// assert_eq!(tenant.specific(), Some(&5));
/// assert!(Dimension::<u64>::Common.is_common());
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Dimension<T> {
    /// Applies to everyone.
    #[default]
    Common,
    /// Applies to one concrete identifier.
    Specific(T),
}

impl<T> Dimension<T> {
    /// Returns true if this is the wildcard value.
    pub fn is_common(&self) -> bool {
        matches!(self, Self::Common)
    }

    /// Returns true if this carries a concrete identifier.
    pub fn is_specific(&self) -> bool {
        matches!(self, Self::Specific(_))
    }

    /// Returns the concrete identifier, if any.
    pub fn specific(&self) -> Option<&T> {
        match self {
            Self::Common => None,
            Self::Specific(v) => Some(v),
        }
    }

    /// Converts to an `Option`, `Common` becoming `None`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Common => None,
            Self::Specific(v) => Some(v),
        }
    }
}

impl Dimension<Id> {
    /// Maps a legacy numeric sentinel (zero meaning "common") to a dimension.
    pub fn from_raw(id: Id) -> Self {
        if id == 0 {
            Self::Common
        } else {
            Self::Specific(id)
        }
    }
}

impl<T> From<Option<T>> for Dimension<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Specific(v),
            None => Self::Common,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Dimension<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Common => f.write_str("*"),
            Self::Specific(v) => v.fmt(f),
        }
    }
}

/// Names one of the four override dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    Context,
    Tenant,
    Client,
    Product,
}

impl DimensionKind {
    /// All dimensions in collapse order, innermost first.
    pub const COLLAPSE_ORDER: [DimensionKind; 4] =
        [Self::Context, Self::Tenant, Self::Client, Self::Product];
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Context => "context",
            Self::Tenant => "tenant",
            Self::Client => "client",
            Self::Product => "product",
        };
        f.write_str(name)
    }
}

/// The dimensions a resource type can be overridden on.
///
/// Dimensions outside the set are forced to common before the walk starts,
/// so they never contribute a step.
///
/// # Example
///
/// ```
/// use strata_core::{DimensionKind, DimensionSet};
///
/// let products_only = DimensionSet::none().with(DimensionKind::Product);
/// assert!(products_only.contains(DimensionKind::Product));
/// assert!(!products_only.contains(DimensionKind::Tenant));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionSet {
    context: bool,
    tenant: bool,
    client: bool,
    product: bool,
}

impl DimensionSet {
    /// Every dimension participates.
    pub const fn all() -> Self {
        Self {
            context: true,
            tenant: true,
            client: true,
            product: true,
        }
    }

    /// No dimension participates; every walk is a single common key.
    pub const fn none() -> Self {
        Self {
            context: false,
            tenant: false,
            client: false,
            product: false,
        }
    }

    /// Returns a copy with the given dimension enabled.
    pub fn with(mut self, kind: DimensionKind) -> Self {
        *self.slot(kind) = true;
        self
    }

    /// Returns a copy with the given dimension disabled.
    pub fn without(mut self, kind: DimensionKind) -> Self {
        *self.slot(kind) = false;
        self
    }

    /// Returns true if the dimension participates.
    pub fn contains(&self, kind: DimensionKind) -> bool {
        match kind {
            DimensionKind::Context => self.context,
            DimensionKind::Tenant => self.tenant,
            DimensionKind::Client => self.client,
            DimensionKind::Product => self.product,
        }
    }

    fn slot(&mut self, kind: DimensionKind) -> &mut bool {
        match kind {
            DimensionKind::Context => &mut self.context,
            DimensionKind::Tenant => &mut self.tenant,
            DimensionKind::Client => &mut self.client,
            DimensionKind::Product => &mut self.product,
        }
    }
}

impl Default for DimensionSet {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_sentinel() {
        assert_eq!(Dimension::from_raw(0), Dimension::Common);
        assert_eq!(Dimension::from_raw(42), Dimension::Specific(42));
    }

    #[test]
    fn test_option_conversion() {
        let d: Dimension<Id> = Some(3).into();
        assert_eq!(d.into_option(), Some(3));

        let d: Dimension<Id> = None.into();
        assert!(d.is_common());
    }

    #[test]
    fn test_display() {
        assert_eq!(Dimension::Specific(9u64).to_string(), "9");
        assert_eq!(Dimension::<u64>::Common.to_string(), "*");
    }

    #[test]
    fn test_dimension_set_toggles() {
        let set = DimensionSet::all().without(DimensionKind::Context);
        assert!(!set.contains(DimensionKind::Context));
        assert!(set.contains(DimensionKind::Tenant));
        assert!(set.contains(DimensionKind::Client));
        assert!(set.contains(DimensionKind::Product));

        let set = set.with(DimensionKind::Context);
        assert_eq!(set, DimensionSet::all());
    }
}
