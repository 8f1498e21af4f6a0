//! Error types for the cache runtime.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use strata_core::LoadError;
use thiserror::Error;

/// Lifecycle of a [`CacheStore`](crate::CacheStore).
///
/// Transitions only go forward: uninitialized, active, destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Uninitialized,
    Active,
    Destroyed,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Active => "active",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// Errors returned by cache stores, the sweeper and the resolver.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The store is not in a state that allows the operation.
    #[error("cache store '{store}' is {state}, cannot {operation}")]
    InvalidState {
        /// Name of the store
        store: String,
        /// State the store was in
        state: Lifecycle,
        /// Operation that was refused
        operation: &'static str,
    },

    /// The source failed to produce a value.
    ///
    /// The cause is shared so a memoized failure can be replayed to every
    /// caller without loading again.
    #[error("cache store '{store}' failed to load {key}: {cause}")]
    SourceLoad {
        /// Name of the store
        store: String,
        /// Debug rendering of the key being loaded
        key: String,
        /// What the source reported
        #[source]
        cause: Arc<LoadError>,
    },

    /// Settings could not be read or parsed.
    #[error("invalid cache settings: {0}")]
    InvalidSettings(String),
}

impl CacheError {
    /// Creates an InvalidState error.
    pub fn invalid_state(store: impl Into<String>, state: Lifecycle, operation: &'static str) -> Self {
        Self::InvalidState {
            store: store.into(),
            state,
            operation,
        }
    }

    /// Creates a SourceLoad error.
    pub fn source_load(store: impl Into<String>, key: impl Into<String>, cause: Arc<LoadError>) -> Self {
        Self::SourceLoad {
            store: store.into(),
            key: key.into(),
            cause,
        }
    }

    /// Returns true if this is an InvalidState error.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// Returns true if this error came from the source.
    pub fn is_source_error(&self) -> bool {
        matches!(self, Self::SourceLoad { .. })
    }

    /// Returns the underlying source failure, if any.
    pub fn load_error(&self) -> Option<&LoadError> {
        match self {
            Self::SourceLoad { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

/// Type alias for Results with CacheError.
pub type Result<T> = std::result::Result<T, CacheError>;
