//! A single cached result and its clocks.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use strata_core::LoadError;
use tokio::time::Instant;

/// What a load produced.
#[derive(Debug)]
pub enum Outcome<T> {
    /// A value.
    Value(Arc<T>),
    /// The source had nothing for the key.
    Empty,
    /// The source failed; the failure is replayed until the entry expires.
    Failed(Arc<LoadError>),
}

impl<T> Clone for Outcome<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(v) => Self::Value(Arc::clone(v)),
            Self::Empty => Self::Empty,
            Self::Failed(e) => Self::Failed(Arc::clone(e)),
        }
    }
}

impl<T> Outcome<T> {
    /// Returns the kind of outcome, for diagnostics.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Value(_) => OutcomeKind::Value,
            Self::Empty => OutcomeKind::Empty,
            Self::Failed(_) => OutcomeKind::Failed,
        }
    }
}

/// Discriminant of an [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Value,
    Empty,
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct Clocks {
    created_at: Instant,
    last_accessed_at: Instant,
}

/// One cached outcome plus its creation and last-access times.
///
/// The outcome is fixed at construction; a stale entry is replaced by a new
/// one, never edited. Only the clocks move, under the entry's own lock.
#[derive(Debug)]
pub struct CacheEntry<T> {
    outcome: Outcome<T>,
    clocks: Mutex<Clocks>,
}

impl<T> CacheEntry<T> {
    /// Creates an entry stamped with the current time.
    pub fn new(outcome: Outcome<T>) -> Self {
        let now = Instant::now();
        Self {
            outcome,
            clocks: Mutex::new(Clocks {
                created_at: now,
                last_accessed_at: now,
            }),
        }
    }

    /// Returns the outcome without counting as an access.
    pub fn outcome(&self) -> &Outcome<T> {
        &self.outcome
    }

    /// Returns the outcome and refreshes the last-access time.
    pub fn read(&self) -> Outcome<T> {
        self.clocks.lock().last_accessed_at = Instant::now();
        self.outcome.clone()
    }

    /// Marks the entry fresh again without reloading it.
    pub fn revalidate(&self) {
        let now = Instant::now();
        let mut clocks = self.clocks.lock();
        clocks.created_at = now;
        clocks.last_accessed_at = now;
    }

    /// Returns the time since the entry was created or last revalidated.
    pub fn age(&self) -> Duration {
        self.clocks.lock().created_at.elapsed()
    }

    /// Returns the time since the entry was last read.
    pub fn idle(&self) -> Duration {
        self.clocks.lock().last_accessed_at.elapsed()
    }

    /// Returns true if the entry is older than `cache_duration`.
    ///
    /// `None` never expires.
    pub fn is_expired(&self, cache_duration: Option<Duration>) -> bool {
        cache_duration.is_some_and(|limit| self.age() > limit)
    }

    /// Returns true if the entry has not been read for longer than
    /// `dormant_duration`.
    ///
    /// `None` is never dormant.
    pub fn is_dormant(&self, dormant_duration: Option<Duration>) -> bool {
        dormant_duration.is_some_and(|limit| self.idle() > limit)
    }

    /// Returns the cached value, if the outcome holds one.
    pub fn value(&self) -> Option<&Arc<T>> {
        match &self.outcome {
            Outcome::Value(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_strict() {
        let entry = CacheEntry::new(Outcome::Value(Arc::new("v1")));
        let limit = Some(Duration::from_millis(1000));

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(!entry.is_expired(limit));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired(limit));
        assert!(!entry.is_expired(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_refreshes_access_not_age() {
        let entry = CacheEntry::new(Outcome::Value(Arc::new(1u32)));
        let dormant = Some(Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(8)).await;
        entry.read();
        tokio::time::advance(Duration::from_secs(8)).await;

        assert!(!entry.is_dormant(dormant));
        assert_eq!(entry.age(), Duration::from_secs(16));
        assert_eq!(entry.idle(), Duration::from_secs(8));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(entry.is_dormant(dormant));
        assert!(!entry.is_dormant(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revalidate_resets_age() {
        let entry = CacheEntry::new(Outcome::Value(Arc::new(1u32)));
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(entry.is_expired(Some(Duration::from_millis(1000))));

        entry.revalidate();
        assert_eq!(entry.age(), Duration::ZERO);
        assert!(!entry.is_expired(Some(Duration::from_millis(1000))));
    }

    #[test]
    fn test_outcome_kind() {
        let failed: Outcome<u32> = Outcome::Failed(Arc::new(LoadError::other("boom")));
        assert_eq!(failed.kind(), OutcomeKind::Failed);
        assert_eq!(Outcome::<u32>::Empty.kind(), OutcomeKind::Empty);

        let entry = CacheEntry::new(Outcome::Value(Arc::new(5u32)));
        assert_eq!(entry.value().map(|v| **v), Some(5));
        assert!(CacheEntry::<u32>::new(Outcome::Empty).value().is_none());
    }
}
