//! Store registration.

use std::sync::Weak;

use parking_lot::Mutex;

use crate::error::Result;

/// Identifies a store registration with a sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

/// What the sweeper needs from a store.
pub trait Sweepable: Send + Sync {
    /// Returns the store name, for logging.
    fn name(&self) -> &str;

    /// Returns true while the store accepts operations.
    fn is_active(&self) -> bool;

    /// Evicts dormant entries, returning how many were removed.
    fn clean_dormant(&self) -> Result<usize>;

    /// Evicts every entry, returning how many were removed.
    fn clean_all(&self) -> Result<usize>;
}

/// Thread-safe list of registered stores.
#[derive(Default)]
pub(crate) struct Registry {
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    stores: Vec<(RegistrationId, Weak<dyn Sweepable>)>,
}

impl Registry {
    pub(crate) fn register(&self, store: Weak<dyn Sweepable>) -> RegistrationId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = RegistrationId(inner.next_id);
        inner.stores.push((id, store));
        id
    }

    pub(crate) fn unregister(&self, id: RegistrationId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.stores.len();
        inner.stores.retain(|(registered, _)| *registered != id);
        inner.stores.len() != before
    }

    /// Returns the live stores, dropping registrations whose store is gone.
    pub(crate) fn snapshot(&self) -> Vec<std::sync::Arc<dyn Sweepable>> {
        let mut inner = self.inner.lock();
        inner.stores.retain(|(_, store)| store.strong_count() > 0);
        inner
            .stores
            .iter()
            .filter_map(|(_, store)| store.upgrade())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().stores.len()
    }
}
