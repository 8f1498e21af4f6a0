//! Diagnostic snapshot of a store.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::Serialize;

use super::CacheStore;
use crate::entry::OutcomeKind;
use crate::error::{Lifecycle, Result};

/// One entry as seen by [`CacheStore::dump`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryDump {
    pub key: String,
    pub kind: OutcomeKind,
    pub age_ms: u64,
    pub idle_ms: u64,
    pub expired: bool,
    pub dormant: bool,
}

/// Serializable snapshot of a store's entries, sorted by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreDump {
    pub store: String,
    pub state: Lifecycle,
    pub entries: Vec<EntryDump>,
}

impl StoreDump {
    /// Renders the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl<K, T> CacheStore<K, T>
where
    K: Eq + Hash + Clone + Debug + Display + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Takes a snapshot of every entry without touching its access time.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidState` outside the active state.
    pub fn dump(&self) -> Result<StoreDump> {
        let cache_duration = self.policy.cache_duration();
        let dormant_duration = self.policy.dormant_duration();

        let mut entries: Vec<EntryDump> = {
            let state = self.state.read();
            self.active_entries(&state, "dump")?
                .iter()
                .map(|(key, entry)| EntryDump {
                    key: key.to_string(),
                    kind: entry.outcome().kind(),
                    age_ms: entry.age().as_millis() as u64,
                    idle_ms: entry.idle().as_millis() as u64,
                    expired: entry.is_expired(cache_duration),
                    dormant: entry.is_dormant(dormant_duration),
                })
                .collect()
        };
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(StoreDump {
            store: self.name.clone(),
            state: Lifecycle::Active,
            entries,
        })
    }
}
