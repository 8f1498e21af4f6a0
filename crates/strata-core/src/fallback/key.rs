//! The composite fallback key.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::context_path::ContextPath;
use super::dimension::{Dimension, DimensionKind, DimensionSet, Id};
use super::sequence::FallbackSequence;

/// Describes the single dimension change between a key and its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collapse {
    /// The innermost concrete context instance was replaced by its template.
    ContextLink,
    /// The (fully templated) context path was dropped.
    ContextCleared,
    /// The tenant became common.
    Tenant,
    /// The client became common.
    Client,
    /// The product became common.
    Product,
}

impl Collapse {
    /// Returns the dimension this step touched.
    pub fn kind(&self) -> DimensionKind {
        match self {
            Self::ContextLink | Self::ContextCleared => DimensionKind::Context,
            Self::Tenant => DimensionKind::Tenant,
            Self::Client => DimensionKind::Client,
            Self::Product => DimensionKind::Product,
        }
    }
}

/// A lookup key with an identity and four overridable dimensions.
///
/// The identity (an application id, a page id, ...) is fixed for the whole
/// fallback walk; context, tenant, client and product collapse towards
/// common one step at a time, in that order.
///
/// # Example
///
/// ```
/// use strata_core::FallbackKey;
///
/// let key = FallbackKey::new("checkout").with_tenant(5).with_product(2);
/// assert_eq!(key.specificity(), 2);
///
/// let parent = key.parent().unwrap();
/// assert!(parent.tenant().is_common());
/// assert!(parent.product().is_specific());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FallbackKey<I> {
    identity: I,
    context: Option<ContextPath>,
    tenant: Dimension<Id>,
    client: Dimension<Id>,
    product: Dimension<Id>,
}

impl<I> FallbackKey<I> {
    /// Creates the fully common key for an identity.
    pub fn new(identity: I) -> Self {
        Self {
            identity,
            context: None,
            tenant: Dimension::Common,
            client: Dimension::Common,
            product: Dimension::Common,
        }
    }

    /// Sets the tenant override. Zero is the common tenant.
    pub fn with_tenant(mut self, tenant: Id) -> Self {
        self.tenant = Dimension::from_raw(tenant);
        self
    }

    /// Sets the client override. Zero is the common client.
    pub fn with_client(mut self, client: Id) -> Self {
        self.client = Dimension::from_raw(client);
        self
    }

    /// Sets the product override. Zero is the common product.
    pub fn with_product(mut self, product: Id) -> Self {
        self.product = Dimension::from_raw(product);
        self
    }

    /// Sets the context path.
    pub fn with_context(mut self, context: ContextPath) -> Self {
        self.context = Some(context);
        self
    }

    /// Sets every dimension at once from explicit values.
    pub fn with_dimensions(
        mut self,
        product: Dimension<Id>,
        client: Dimension<Id>,
        tenant: Dimension<Id>,
        context: Option<ContextPath>,
    ) -> Self {
        self.product = product;
        self.client = client;
        self.tenant = tenant;
        self.context = context;
        self
    }

    /// Returns the identity being looked up.
    pub fn identity(&self) -> &I {
        &self.identity
    }

    /// Returns the context path, if any.
    pub fn context(&self) -> Option<&ContextPath> {
        self.context.as_ref()
    }

    /// Returns the tenant dimension.
    pub fn tenant(&self) -> Dimension<Id> {
        self.tenant
    }

    /// Returns the client dimension.
    pub fn client(&self) -> Dimension<Id> {
        self.client
    }

    /// Returns the product dimension.
    pub fn product(&self) -> Dimension<Id> {
        self.product
    }

    /// Returns true if every override dimension is common.
    pub fn is_common(&self) -> bool {
        self.context.is_none()
            && self.tenant.is_common()
            && self.client.is_common()
            && self.product.is_common()
    }

    /// Counts the collapse steps left before this key becomes common.
    ///
    /// Every call to [`parent`](Self::parent) lowers this by exactly one,
    /// and the common key scores zero.
    pub fn specificity(&self) -> usize {
        let context = self
            .context
            .as_ref()
            .map(|path| path.specific_links() + 1)
            .unwrap_or(0);

        context
            + usize::from(self.tenant.is_specific())
            + usize::from(self.client.is_specific())
            + usize::from(self.product.is_specific())
    }

    /// Returns a copy with every dimension outside `dimensions` forced to common.
    pub fn restrict(mut self, dimensions: DimensionSet) -> Self {
        if !dimensions.contains(DimensionKind::Context) {
            self.context = None;
        }
        if !dimensions.contains(DimensionKind::Tenant) {
            self.tenant = Dimension::Common;
        }
        if !dimensions.contains(DimensionKind::Client) {
            self.client = Dimension::Common;
        }
        if !dimensions.contains(DimensionKind::Product) {
            self.product = Dimension::Common;
        }
        self
    }

    /// Replaces the identity, keeping every dimension.
    pub fn map_identity<J>(self, f: impl FnOnce(I) -> J) -> FallbackKey<J> {
        FallbackKey {
            identity: f(self.identity),
            context: self.context,
            tenant: self.tenant,
            client: self.client,
            product: self.product,
        }
    }

    /// Lists the dimensions in which two keys differ.
    pub fn differing_dimensions(&self, other: &Self) -> Vec<DimensionKind> {
        DimensionKind::COLLAPSE_ORDER
            .into_iter()
            .filter(|kind| match kind {
                DimensionKind::Context => self.context != other.context,
                DimensionKind::Tenant => self.tenant != other.tenant,
                DimensionKind::Client => self.client != other.client,
                DimensionKind::Product => self.product != other.product,
            })
            .collect()
    }
}

impl<I: Clone> FallbackKey<I> {
    /// Computes the next, less specific key and the step that produced it.
    ///
    /// Dimensions that are already common are skipped. Returns `None` for
    /// the common key.
    pub fn collapse(&self) -> Option<(Collapse, Self)> {
        let mut next = self.clone();

        let step = if let Some(path) = &self.context {
            match path.parent() {
                Some(parent) => {
                    next.context = Some(parent);
                    Collapse::ContextLink
                },
                None => {
                    next.context = None;
                    Collapse::ContextCleared
                },
            }
        } else if self.tenant.is_specific() {
            next.tenant = Dimension::Common;
            Collapse::Tenant
        } else if self.client.is_specific() {
            next.client = Dimension::Common;
            Collapse::Client
        } else if self.product.is_specific() {
            next.product = Dimension::Common;
            Collapse::Product
        } else {
            return None;
        };

        Some((step, next))
    }

    /// Returns the next, less specific key, or `None` for the common key.
    pub fn parent(&self) -> Option<Self> {
        self.collapse().map(|(_, key)| key)
    }

    /// Returns the fully common key for the same identity.
    pub fn common(&self) -> Self {
        Self::new(self.identity.clone())
    }

    /// Walks this key from most to least specific, starting with itself.
    pub fn fallbacks(&self) -> FallbackSequence<I> {
        FallbackSequence::new(self.clone())
    }
}

impl<I: fmt::Display> fmt::Display for FallbackKey<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:",
            self.identity, self.product, self.client, self.tenant
        )?;
        match &self.context {
            Some(path) => write!(f, "{}", path),
            None => f.write_str("*"),
        }
    }
}
