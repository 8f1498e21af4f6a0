//! Load-through cache store.
//!
//! A [`CacheStore`] holds one [`CacheEntry`] per key and loads missing or
//! stale entries through its [`Source`]. Freshness and dormancy are tracked
//! separately:
//!
//! - an *expired* entry is revalidated or reloaded on its next read;
//! - a *dormant* entry (not read for a while) is evicted by the
//!   [`DormantSweeper`], whatever its freshness.
//!
//! The entry map sits behind one lock that is never held while the source
//! is called. Two concurrent misses on the same key may therefore both load;
//! the last one to finish wins the slot.

mod dump;
mod invalidation;

pub use dump::{EntryDump, StoreDump};
pub use invalidation::InvalidationResult;

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use strata_core::LoadError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::entry::{CacheEntry, Outcome};
use crate::error::{CacheError, Lifecycle, Result};
use crate::metrics::{CacheMetrics, EvictionReason};
use crate::policy::CachePolicy;
use crate::source::Source;
use crate::sweeper::{DormantSweeper, RegistrationId, Sweepable};

type Entries<K, T> = HashMap<K, Arc<CacheEntry<T>>>;

struct StoreState<K, T> {
    lifecycle: Lifecycle,
    entries: Option<Entries<K, T>>,
    registration: Option<RegistrationId>,
}

/// A cache of `T` values keyed by `K`, loaded through a [`Source`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use strata_cache::{CachePolicy, CacheStore, DormantSweeper, Source};
/// use strata_core::LoadError;
///
/// struct Squares;
///
/// #[async_trait]
/// impl Source<u64, u64> for Squares {
///     async fn load(&self, key: &u64) -> Result<Option<u64>, LoadError> {
///         Ok(Some(key * key))
///     }
///
///     fn name(&self) -> &str {
///         "squares"
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sweeper = Arc::new(DormantSweeper::new(Duration::from_secs(60)));
/// let store = CacheStore::<u64, u64>::new("squares", CachePolicy::default(), Arc::new(Squares), sweeper);
/// store.initialize()?;
///
/// assert_eq!(store.get(&12).await?.as_deref(), Some(&144));
/// store.destroy()?;
/// # Ok(())
/// # }
/// ```
pub struct CacheStore<K, T> {
    name: String,
    policy: CachePolicy,
    source: Arc<dyn Source<K, T>>,
    sweeper: Arc<DormantSweeper>,
    metrics: CacheMetrics,
    state: RwLock<StoreState<K, T>>,
}

impl<K, T> CacheStore<K, T>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Creates an uninitialized store.
    pub fn new(
        name: impl Into<String>,
        policy: CachePolicy,
        source: Arc<dyn Source<K, T>>,
        sweeper: Arc<DormantSweeper>,
    ) -> Arc<Self> {
        let name = name.into();
        Arc::new(Self {
            metrics: CacheMetrics::new(name.as_str()),
            name,
            policy,
            source,
            sweeper,
            state: RwLock::new(StoreState {
                lifecycle: Lifecycle::Uninitialized,
                entries: None,
                registration: None,
            }),
        })
    }

    /// Returns the store name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the store policy.
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Returns the store metrics.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Returns the current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.read().lifecycle
    }

    /// Activates the store and registers it with the sweeper.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidState` unless the store is uninitialized.
    pub fn initialize(self: &Arc<Self>) -> Result<()> {
        let mut state = self.state.write();
        if state.lifecycle != Lifecycle::Uninitialized {
            return Err(self.invalid_state(state.lifecycle, "initialize"));
        }

        let me: Arc<dyn Sweepable> = self.clone();
        let registration = self.sweeper.register(Arc::downgrade(&me));

        state.lifecycle = Lifecycle::Active;
        state.entries = Some(HashMap::new());
        state.registration = Some(registration);

        info!(store = %self.name, source = %self.source.name(), "Cache store initialized");
        Ok(())
    }

    /// Returns the value for `key`, loading it on a miss.
    ///
    /// - Missing entry: loads through the source.
    /// - Fresh entry: returns the cached outcome (value, empty or memoized
    ///   failure) and refreshes its last-access time.
    /// - Expired value: reloads it if the source reports it modified,
    ///   otherwise revalidates it in place.
    /// - Expired empty or failed entry: loads again.
    ///
    /// # Errors
    ///
    /// `CacheError::InvalidState` outside the active state, and
    /// `CacheError::SourceLoad` when the source fails (or a memoized failure
    /// is replayed). A failure is never retried within a single call.
    ///
    /// The map lock is released once the entry is found, so a concurrent
    /// `clean_all` may dispose of the value this call is about to return.
    /// The lifecycle is checked again before a cached outcome is handed
    /// out, which turns a concurrent `destroy` into `InvalidState`.
    pub async fn get(&self, key: &K) -> Result<Option<Arc<T>>> {
        let Some(entry) = self.lookup(key)? else {
            self.metrics.record_miss();
            return self.load(key).await;
        };

        if !entry.is_expired(self.policy.cache_duration()) {
            self.metrics.record_hit();
            let outcome = entry.read();
            self.active_check("get")?;
            return self.unwrap_outcome(key, outcome);
        }

        match entry.outcome() {
            Outcome::Value(current) => {
                if self.source.is_modified(key, current) {
                    self.reload(key, Arc::clone(current)).await
                } else {
                    entry.revalidate();
                    self.metrics.record_revalidation();
                    debug!(store = %self.name, key = ?key, "Expired entry revalidated");
                    let outcome = entry.read();
                    self.active_check("get")?;
                    self.unwrap_outcome(key, outcome)
                }
            },
            Outcome::Empty | Outcome::Failed(_) => {
                self.metrics.record_miss();
                self.load(key).await
            },
        }
    }

    /// Removes and disposes of every dormant entry.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidState` outside the active state.
    pub fn clean_dormant(&self) -> Result<usize> {
        let dormant = self.policy.dormant_duration();
        if dormant.is_none() {
            self.active_check("clean dormant entries")?;
            return Ok(0);
        }

        let removed = {
            let mut state = self.state.write();
            let entries = self.active_entries_mut(&mut state, "clean dormant entries")?;

            let keys: Vec<K> = entries
                .iter()
                .filter(|(_, entry)| entry.is_dormant(dormant))
                .map(|(key, _)| key.clone())
                .collect();

            let removed: Vec<_> = keys
                .into_iter()
                .filter_map(|key| entries.remove(&key).map(|entry| (key, entry)))
                .collect();
            self.metrics.update_entry_count(entries.len());
            removed
        };

        let count = removed.len();
        self.dispose_all(removed, EvictionReason::Dormant);
        if count > 0 {
            debug!(store = %self.name, evicted = count, "Dormant entries evicted");
        }
        Ok(count)
    }

    /// Removes and disposes of every entry, leaving the store active and
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidState` outside the active state.
    pub fn clean_all(&self) -> Result<usize> {
        let drained = {
            let mut state = self.state.write();
            let entries = self.active_entries_mut(&mut state, "clean all entries")?;
            let drained: Vec<_> = std::mem::take(entries).into_iter().collect();
            self.metrics.update_entry_count(0);
            drained
        };

        let count = drained.len();
        self.dispose_all(drained, EvictionReason::Flush);
        info!(store = %self.name, evicted = count, "Cache store flushed");
        Ok(count)
    }

    /// Unregisters from the sweeper, disposes of every entry and marks the
    /// store destroyed. Every later call fails with `InvalidState`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidState` unless the store is active.
    pub fn destroy(&self) -> Result<usize> {
        let (entries, registration) = {
            let mut state = self.state.write();
            if state.lifecycle != Lifecycle::Active {
                return Err(self.invalid_state(state.lifecycle, "destroy"));
            }
            state.lifecycle = Lifecycle::Destroyed;
            (state.entries.take().unwrap_or_default(), state.registration.take())
        };

        if let Some(id) = registration {
            self.sweeper.unregister(id);
        }

        let count = entries.len();
        self.dispose_all(entries.into_iter().collect(), EvictionReason::Flush);
        self.metrics.update_entry_count(0);

        info!(store = %self.name, evicted = count, "Cache store destroyed");
        Ok(count)
    }

    /// Removes one entry, disposing of its value. Returns true if the key
    /// was cached.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidState` outside the active state.
    pub fn invalidate(&self, key: &K) -> Result<bool> {
        let removed = {
            let mut state = self.state.write();
            let entries = self.active_entries_mut(&mut state, "invalidate")?;
            let removed = entries.remove(key);
            self.metrics.update_entry_count(entries.len());
            removed
        };

        match removed {
            Some(entry) => {
                self.dispose_all(vec![(key.clone(), entry)], EvictionReason::Invalidated);
                Ok(true)
            },
            None => Ok(false),
        }
    }

    /// Returns a snapshot of the cached keys.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidState` outside the active state.
    pub fn keys(&self) -> Result<Vec<K>> {
        let state = self.state.read();
        Ok(self.active_entries(&state, "list keys")?.keys().cloned().collect())
    }

    /// Returns the number of cached entries.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidState` outside the active state.
    pub fn size(&self) -> Result<usize> {
        let state = self.state.read();
        Ok(self.active_entries(&state, "count entries")?.len())
    }

    fn lookup(&self, key: &K) -> Result<Option<Arc<CacheEntry<T>>>> {
        let state = self.state.read();
        Ok(self.active_entries(&state, "get")?.get(key).cloned())
    }

    async fn load(&self, key: &K) -> Result<Option<Arc<T>>> {
        let started = Instant::now();
        let result = self.call_source(self.source.load(key)).await;
        self.metrics.record_load(started.elapsed());
        debug!(store = %self.name, key = ?key, ok = result.is_ok(), "Loaded from source");

        self.settle(key, result)
    }

    async fn reload(&self, key: &K, previous: Arc<T>) -> Result<Option<Arc<T>>> {
        let started = Instant::now();
        let result = self.call_source(self.source.reload(key, previous)).await;
        self.metrics.record_reload(started.elapsed());
        debug!(store = %self.name, key = ?key, ok = result.is_ok(), "Reloaded from source");

        self.settle(key, result)
    }

    async fn call_source<F>(&self, call: F) -> std::result::Result<Option<T>, LoadError>
    where
        F: Future<Output = std::result::Result<Option<T>, LoadError>>,
    {
        match self.policy.load_timeout() {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(LoadError::timeout(limit.as_millis() as u64))),
            None => call.await,
        }
    }

    /// Stores the result of a source call according to the policy and turns
    /// it into the caller's answer.
    fn settle(
        &self,
        key: &K,
        result: std::result::Result<Option<T>, LoadError>,
    ) -> Result<Option<Arc<T>>> {
        match result {
            Ok(Some(value)) => {
                let value = Arc::new(value);
                self.store_outcome(key, Some(Outcome::Value(Arc::clone(&value))))?;
                Ok(Some(value))
            },
            Ok(None) => {
                let outcome = self.policy.cache_null_result().then_some(Outcome::Empty);
                self.store_outcome(key, outcome)?;
                Ok(None)
            },
            Err(e) => {
                self.metrics.record_load_failure();
                let cause = Arc::new(e);
                warn!(store = %self.name, key = ?key, error = %cause, "Source load failed");

                if self.policy.cache_error_result() {
                    self.store_outcome(key, Some(Outcome::Failed(Arc::clone(&cause))))?;
                }
                Err(CacheError::source_load(&self.name, format!("{key:?}"), cause))
            },
        }
    }

    /// Replaces the entry for `key`, or drops it when `outcome` is `None`.
    ///
    /// The value it supersedes is disposed of, and so is a value loaded for
    /// a store that was destroyed meanwhile. Disposal happens after the map
    /// lock is released.
    fn store_outcome(&self, key: &K, outcome: Option<Outcome<T>>) -> Result<()> {
        let (result, leftover) = {
            let mut state = self.state.write();
            match self.active_entries_mut(&mut state, "store a loaded value") {
                Ok(entries) => {
                    let incoming = match &outcome {
                        Some(Outcome::Value(value)) => Some(Arc::clone(value)),
                        _ => None,
                    };
                    let previous = match outcome {
                        Some(outcome) => entries.insert(key.clone(), Arc::new(CacheEntry::new(outcome))),
                        None => entries.remove(key),
                    };
                    self.metrics.update_entry_count(entries.len());

                    let superseded = previous
                        .and_then(|entry| entry.value().cloned())
                        .filter(|old| !incoming.as_ref().is_some_and(|new| Arc::ptr_eq(old, new)));
                    (Ok(()), superseded)
                },
                Err(e) => {
                    let rejected = match outcome {
                        Some(Outcome::Value(value)) => Some(value),
                        _ => None,
                    };
                    (Err(e), rejected)
                },
            }
        };

        if let Some(value) = leftover {
            self.dispose_value(key, &value);
        }
        result
    }

    fn unwrap_outcome(&self, key: &K, outcome: Outcome<T>) -> Result<Option<Arc<T>>> {
        match outcome {
            Outcome::Value(value) => Ok(Some(value)),
            Outcome::Empty => Ok(None),
            Outcome::Failed(cause) => Err(CacheError::source_load(&self.name, format!("{key:?}"), cause)),
        }
    }

    fn dispose_all(&self, removed: Vec<(K, Arc<CacheEntry<T>>)>, reason: EvictionReason) {
        self.metrics.record_evictions(reason, removed.len());
        for (key, entry) in removed {
            if let Some(value) = entry.value() {
                self.dispose_value(&key, value);
            }
        }
    }

    fn dispose_value(&self, key: &K, value: &T) {
        if let Err(e) = self.source.dispose(value) {
            warn!(store = %self.name, key = ?key, error = %e, "Failed to dispose cached value");
        }
    }

    fn active_check(&self, operation: &'static str) -> Result<()> {
        let lifecycle = self.lifecycle();
        if lifecycle == Lifecycle::Active {
            Ok(())
        } else {
            Err(self.invalid_state(lifecycle, operation))
        }
    }

    fn active_entries<'a>(
        &self,
        state: &'a StoreState<K, T>,
        operation: &'static str,
    ) -> Result<&'a Entries<K, T>> {
        match (&state.lifecycle, &state.entries) {
            (Lifecycle::Active, Some(entries)) => Ok(entries),
            _ => Err(self.invalid_state(state.lifecycle, operation)),
        }
    }

    fn active_entries_mut<'a>(
        &self,
        state: &'a mut StoreState<K, T>,
        operation: &'static str,
    ) -> Result<&'a mut Entries<K, T>> {
        match (&state.lifecycle, &mut state.entries) {
            (Lifecycle::Active, Some(entries)) => Ok(entries),
            (lifecycle, _) => Err(self.invalid_state(*lifecycle, operation)),
        }
    }

    fn invalid_state(&self, state: Lifecycle, operation: &'static str) -> CacheError {
        CacheError::invalid_state(&self.name, state, operation)
    }
}

impl<K, T> Sweepable for CacheStore<K, T>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.lifecycle() == Lifecycle::Active
    }

    fn clean_dormant(&self) -> Result<usize> {
        CacheStore::clean_dormant(self)
    }

    fn clean_all(&self) -> Result<usize> {
        CacheStore::clean_all(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedSource {
        loads: AtomicUsize,
        disposed: Mutex<Vec<String>>,
        answers: Mutex<Vec<std::result::Result<Option<String>, LoadError>>>,
    }

    impl ScriptedSource {
        fn answering(answers: Vec<std::result::Result<Option<String>, LoadError>>) -> Arc<Self> {
            let mut answers = answers;
            answers.reverse();
            Arc::new(Self {
                answers: Mutex::new(answers),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl Source<u64, String> for ScriptedSource {
        async fn load(&self, key: &u64) -> std::result::Result<Option<String>, LoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.answers
                .lock()
                .pop()
                .unwrap_or_else(|| Ok(Some(format!("value-{key}"))))
        }

        fn dispose(&self, value: &String) -> std::result::Result<(), LoadError> {
            self.disposed.lock().push(value.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn store_with(
        policy: CachePolicy,
        source: Arc<ScriptedSource>,
    ) -> Arc<CacheStore<u64, String>> {
        let sweeper = Arc::new(DormantSweeper::new(Duration::from_secs(60)));
        let store = CacheStore::<u64, String>::new("test", policy, source, sweeper);
        store.initialize().unwrap();
        store
    }

    #[tokio::test]
    async fn test_get_before_initialize_fails() {
        let sweeper = Arc::new(DormantSweeper::new(Duration::from_secs(60)));
        let store = CacheStore::<u64, String>::new(
            "test",
            CachePolicy::default(),
            ScriptedSource::answering(vec![]),
            sweeper,
        );

        let err = store.get(&1).await.unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(store.lifecycle(), Lifecycle::Uninitialized);
    }

    #[tokio::test]
    async fn test_initialize_twice_fails() {
        let store = store_with(CachePolicy::default(), ScriptedSource::answering(vec![]));
        assert!(store.initialize().unwrap_err().is_invalid_state());
    }

    #[tokio::test]
    async fn test_hit_does_not_reload() {
        let source = ScriptedSource::answering(vec![]);
        let store = store_with(CachePolicy::default(), source.clone());

        assert_eq!(store.get(&1).await.unwrap().as_deref().map(String::as_str), Some("value-1"));
        assert_eq!(store.get(&1).await.unwrap().as_deref().map(String::as_str), Some("value-1"));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert_eq!(store.metrics().hits(), 1);
        assert_eq!(store.metrics().misses(), 1);
    }

    #[tokio::test]
    async fn test_null_result_cached() {
        let source = ScriptedSource::answering(vec![Ok(None)]);
        let store = store_with(CachePolicy::default(), source.clone());

        assert!(store.get(&1).await.unwrap().is_none());
        assert!(store.get(&1).await.unwrap().is_none());
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert_eq!(store.size().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_null_result_not_cached() {
        let source = ScriptedSource::answering(vec![Ok(None)]);
        let policy = CachePolicy::builder().cache_null_result(false).build();
        let store = store_with(policy, source.clone());

        assert!(store.get(&1).await.unwrap().is_none());
        assert_eq!(store.size().unwrap(), 0);
        assert!(store.get(&1).await.unwrap().is_some());
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_timeout() {
        struct Stalled;

        #[async_trait]
        impl Source<u64, String> for Stalled {
            async fn load(&self, _key: &u64) -> std::result::Result<Option<String>, LoadError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }

            fn name(&self) -> &str {
                "stalled"
            }
        }

        let sweeper = Arc::new(DormantSweeper::new(Duration::from_secs(60)));
        let policy = CachePolicy::builder()
            .load_timeout(Duration::from_millis(500))
            .build();
        let store = CacheStore::<u64, String>::new("stalled", policy, Arc::new(Stalled), sweeper);
        store.initialize().unwrap();

        let err = store.get(&1).await.unwrap_err();
        assert!(matches!(err.load_error(), Some(LoadError::Timeout { millis: 500 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_during_get_is_reported() {
        use std::sync::{OnceLock, Weak};

        /// Destroys its own store while the store asks about freshness.
        #[derive(Default)]
        struct SelfDestructing {
            store: OnceLock<Weak<CacheStore<u64, String>>>,
        }

        #[async_trait]
        impl Source<u64, String> for SelfDestructing {
            async fn load(&self, key: &u64) -> std::result::Result<Option<String>, LoadError> {
                Ok(Some(format!("value-{key}")))
            }

            fn is_modified(&self, _key: &u64, _value: &String) -> bool {
                if let Some(store) = self.store.get().and_then(Weak::upgrade) {
                    store.destroy().unwrap();
                }
                false
            }

            fn name(&self) -> &str {
                "self-destructing"
            }
        }

        let source = Arc::new(SelfDestructing::default());
        let sweeper = Arc::new(DormantSweeper::new(Duration::from_secs(60)));
        let policy = CachePolicy::builder().cache_duration(Duration::from_secs(1)).build();
        let store = CacheStore::<u64, String>::new("doomed", policy, source.clone(), sweeper);
        store.initialize().unwrap();
        source.store.set(Arc::downgrade(&store)).unwrap();

        store.get(&1).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        let err = store.get(&1).await.unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(store.lifecycle(), Lifecycle::Destroyed);
    }

    #[tokio::test]
    async fn test_invalidate_disposes() {
        let source = ScriptedSource::answering(vec![]);
        let store = store_with(CachePolicy::default(), source.clone());

        store.get(&1).await.unwrap();
        assert!(store.invalidate(&1).unwrap());
        assert!(!store.invalidate(&1).unwrap());
        assert_eq!(*source.disposed.lock(), vec!["value-1".to_string()]);
    }

    #[tokio::test]
    async fn test_clean_all_keeps_store_usable() {
        let source = ScriptedSource::answering(vec![]);
        let store = store_with(CachePolicy::default(), source.clone());

        store.get(&1).await.unwrap();
        store.get(&2).await.unwrap();
        assert_eq!(store.clean_all().unwrap(), 2);
        assert_eq!(store.size().unwrap(), 0);
        assert_eq!(source.disposed.lock().len(), 2);

        store.get(&1).await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_destroy_unregisters() {
        let sweeper = Arc::new(DormantSweeper::new(Duration::from_secs(60)));
        let store = CacheStore::<u64, String>::new(
            "test",
            CachePolicy::default(),
            ScriptedSource::answering(vec![]),
            Arc::clone(&sweeper),
        );

        store.initialize().unwrap();
        assert_eq!(sweeper.registered(), 1);

        store.destroy().unwrap();
        assert_eq!(sweeper.registered(), 0);
        assert!(store.destroy().unwrap_err().is_invalid_state());
        assert!(store.initialize().unwrap_err().is_invalid_state());
    }
}
