//! Error types shared by Strata sources, loaders and the cache runtime.
//!
//! All errors implement `std::error::Error` via `thiserror`.
//!
//! - [`LoadError`] is what a configuration source reports when it cannot
//!   produce a value for a key.
//! - [`BuildError`] is what a loader reports when a single raw definition
//!   cannot be turned into a domain value. Loaders skip that item and keep
//!   going; see [`crate::build_each`].
//! - [`ContextPathError`] is returned when a context path string is malformed.
//!
//! # Example
//!
//! ```
//! use strata_core::LoadError;
//!
//! let error = LoadError::unavailable("database connection refused");
//! assert!(error.is_transient());
//! assert_eq!(error.to_string(), "source unavailable: database connection refused");
//! ```

use thiserror::Error;

/// Errors a configuration source can report while loading a value.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source has no definition for the requested key.
    #[error("definition not found: {0}")]
    NotFound(String),

    /// The source is not reachable right now.
    #[error("source unavailable: {reason}")]
    Unavailable {
        /// Why the source could not be reached
        reason: String,
    },

    /// The load did not finish within the allowed time.
    #[error("load timed out after {millis}ms")]
    Timeout {
        /// Time budget that was exceeded, in milliseconds
        millis: u64,
    },

    /// Any other failure, with an optional underlying cause.
    #[error("load failed: {message}")]
    Other {
        /// Description of what went wrong
        message: String,
        /// Underlying error, if any
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl LoadError {
    /// Creates a NotFound error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Creates an Unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a Timeout error.
    pub fn timeout(millis: u64) -> Self {
        Self::Timeout { millis }
    }

    /// Creates an Other error without a cause.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates an Other error wrapping an underlying cause.
    pub fn with_cause<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Returns true if this error indicates the definition does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// A raw definition could not be turned into a domain value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to build {item}: {reason}")]
pub struct BuildError {
    /// Identifies the definition that failed (kind and id)
    pub item: String,
    /// Why construction failed
    pub reason: String,
}

impl BuildError {
    /// Creates a new BuildError.
    pub fn new(item: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            reason: reason.into(),
        }
    }
}

/// A context path string could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid context path '{input}': {reason}")]
pub struct ContextPathError {
    /// The text that was being parsed
    pub input: String,
    /// What was wrong with it
    pub reason: String,
}

impl ContextPathError {
    pub(crate) fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
