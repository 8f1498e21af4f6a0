//! Fallback resolution on top of a cache store.
//!
//! Every domain lookup has the same shape: take the caller's key, walk it
//! from most to least specific, and probe the store at each step. A "get"
//! stops at the first value found; a "list" keeps going and returns every
//! value in walk order, most specific first.
//!
//! The resolver holds no state beyond the store it probes. A failed probe
//! is returned to the caller straight away; there is no default value.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use strata_core::{Dimension, DimensionSet, FallbackKey, FallbackSequence, ScopedFallback, ScopedIdentity};
use tracing::debug;

use crate::error::Result;
use crate::store::CacheStore;

/// A value found during a walk, with the key that produced it.
#[derive(Debug)]
pub struct Resolved<K, T> {
    /// The key the value was cached under.
    pub key: K,
    /// Position of `key` in the walk, starting at zero.
    pub step: usize,
    /// The cached value.
    pub value: Arc<T>,
}

impl<K: Clone, T> Clone for Resolved<K, T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            step: self.step,
            value: Arc::clone(&self.value),
        }
    }
}

/// Resolves keys against one store by walking their fallbacks.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use strata_cache::{CachePolicy, CacheStore, ConfigResolver, DormantSweeper, Source};
/// use strata_core::{FallbackKey, LoadError};
///
/// /// Only the product-wide default of each definition exists.
/// struct Defaults;
///
/// #[async_trait]
/// impl Source<FallbackKey<u64>, String> for Defaults {
///     async fn load(&self, key: &FallbackKey<u64>) -> Result<Option<String>, LoadError> {
///         Ok(key.is_common().then(|| format!("default #{}", key.identity())))
///     }
///
///     fn name(&self) -> &str {
///         "defaults"
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sweeper = Arc::new(DormantSweeper::new(Duration::from_secs(60)));
/// let store = CacheStore::<FallbackKey<u64>, String>::new(
///     "definitions",
///     CachePolicy::default(),
///     Arc::new(Defaults),
///     sweeper,
/// );
/// store.initialize()?;
///
/// let resolver = ConfigResolver::new(store);
/// let found = resolver
///     .get_first(&FallbackKey::new(7).with_tenant(5))
///     .await?
///     .expect("the common key always resolves");
///
/// assert_eq!(found.value.as_str(), "default #7");
/// assert_eq!(found.step, 1);
/// # Ok(())
/// # }
/// ```
pub struct ConfigResolver<K, T> {
    store: Arc<CacheStore<K, T>>,
    dimensions: DimensionSet,
}

impl<K, T> Clone for ConfigResolver<K, T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            dimensions: self.dimensions,
        }
    }
}

impl<K, T> ConfigResolver<K, T>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Creates a resolver in which every dimension participates.
    pub fn new(store: Arc<CacheStore<K, T>>) -> Self {
        Self {
            store,
            dimensions: DimensionSet::all(),
        }
    }

    /// Restricts the dimensions this resource type can be overridden on.
    pub fn with_dimensions(mut self, dimensions: DimensionSet) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Returns the store being probed.
    pub fn store(&self) -> &Arc<CacheStore<K, T>> {
        &self.store
    }

    /// Returns the participating dimensions.
    pub fn dimensions(&self) -> DimensionSet {
        self.dimensions
    }

    /// Probes `keys` in order and returns the first value accepted by
    /// `accept`.
    ///
    /// # Errors
    ///
    /// Returns the first store error met along the way.
    pub async fn first_hit<I, P>(&self, keys: I, accept: P) -> Result<Option<Resolved<K, T>>>
    where
        I: IntoIterator<Item = K>,
        P: Fn(&T) -> bool,
    {
        for (step, key) in keys.into_iter().enumerate() {
            if let Some(value) = self.store.get(&key).await? {
                if accept(&value) {
                    debug!(store = %self.store.name(), key = ?key, step = step, "Resolved");
                    return Ok(Some(Resolved { key, step, value }));
                }
            }
        }

        debug!(store = %self.store.name(), "Nothing resolved");
        Ok(None)
    }

    /// Probes every key in `keys` and returns all values, in order.
    ///
    /// # Errors
    ///
    /// Returns the first store error met along the way.
    pub async fn all_hits<I>(&self, keys: I) -> Result<Vec<Resolved<K, T>>>
    where
        I: IntoIterator<Item = K>,
    {
        let mut found = Vec::new();
        for (step, key) in keys.into_iter().enumerate() {
            if let Some(value) = self.store.get(&key).await? {
                found.push(Resolved { key, step, value });
            }
        }

        debug!(store = %self.store.name(), found = found.len(), "Collected overrides");
        Ok(found)
    }
}

impl<I, T> ConfigResolver<FallbackKey<I>, T>
where
    I: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Lists the keys a lookup of `key` would probe, in order.
    pub fn probe_order(&self, key: &FallbackKey<I>) -> Vec<FallbackKey<I>> {
        self.walk(key).collect()
    }

    /// Returns the most specific value cached or loadable for `key`.
    ///
    /// # Errors
    ///
    /// Returns the first store error met along the way.
    pub async fn get_first(&self, key: &FallbackKey<I>) -> Result<Option<Resolved<FallbackKey<I>, T>>> {
        self.first_hit(self.walk(key), |_| true).await
    }

    /// Like [`get_first`](Self::get_first), skipping values `accept` rejects.
    ///
    /// # Errors
    ///
    /// Returns the first store error met along the way.
    pub async fn get_first_where<P>(
        &self,
        key: &FallbackKey<I>,
        accept: P,
    ) -> Result<Option<Resolved<FallbackKey<I>, T>>>
    where
        P: Fn(&T) -> bool,
    {
        self.first_hit(self.walk(key), accept).await
    }

    /// Returns every value along the walk of `key`, most specific first.
    ///
    /// # Errors
    ///
    /// Returns the first store error met along the way.
    pub async fn collect_all(&self, key: &FallbackKey<I>) -> Result<Vec<Resolved<FallbackKey<I>, T>>> {
        self.all_hits(self.walk(key)).await
    }

    fn walk(&self, key: &FallbackKey<I>) -> FallbackSequence<I> {
        FallbackSequence::with_dimensions(key.clone(), self.dimensions)
    }
}

impl<I, S, T> ConfigResolver<FallbackKey<ScopedIdentity<I, S>>, T>
where
    I: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    S: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Lists the keys a scoped lookup would probe, in order.
    pub fn probe_order_scoped(
        &self,
        key: &FallbackKey<I>,
        scope: &Dimension<S>,
    ) -> Vec<FallbackKey<ScopedIdentity<I, S>>> {
        self.scoped_walk(key, scope).collect()
    }

    /// Returns the most specific value for `key`, trying the scoped
    /// overrides before the unscoped ones.
    ///
    /// # Errors
    ///
    /// Returns the first store error met along the way.
    pub async fn get_first_scoped(
        &self,
        key: &FallbackKey<I>,
        scope: &Dimension<S>,
    ) -> Result<Option<Resolved<FallbackKey<ScopedIdentity<I, S>>, T>>> {
        self.first_hit(self.scoped_walk(key, scope), |_| true).await
    }

    /// Returns every value along the scoped walk, most specific first.
    ///
    /// # Errors
    ///
    /// Returns the first store error met along the way.
    pub async fn collect_all_scoped(
        &self,
        key: &FallbackKey<I>,
        scope: &Dimension<S>,
    ) -> Result<Vec<Resolved<FallbackKey<ScopedIdentity<I, S>>, T>>> {
        self.all_hits(self.scoped_walk(key, scope)).await
    }

    fn scoped_walk(&self, key: &FallbackKey<I>, scope: &Dimension<S>) -> ScopedFallback<I, S> {
        ScopedFallback::new(key.clone().restrict(self.dimensions), scope.clone())
    }
}
