//! The collaborator a cache store loads values through.

use std::sync::Arc;

use async_trait::async_trait;
use strata_core::LoadError;

/// Loads, reloads and disposes of cached values.
///
/// Implemented by the domain layer (repositories, providers) for each
/// resource type. Loads may block on I/O; the store never holds its map
/// lock while calling them.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use strata_cache::Source;
/// use strata_core::LoadError;
///
/// struct Greetings;
///
/// #[async_trait]
/// impl Source<u64, String> for Greetings {
///     async fn load(&self, key: &u64) -> Result<Option<String>, LoadError> {
///         Ok(Some(format!("hello #{key}")))
///     }
///
///     fn name(&self) -> &str {
///         "greetings"
///     }
/// }
/// ```
#[async_trait]
pub trait Source<K, T>: Send + Sync
where
    K: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Loads the value for `key`.
    ///
    /// `Ok(None)` means the source has nothing for this key; whether that
    /// answer is memoized depends on the policy.
    async fn load(&self, key: &K) -> Result<Option<T>, LoadError>;

    /// Reloads an expired value that reported itself modified.
    ///
    /// The default implementation loads from scratch.
    async fn reload(&self, key: &K, previous: Arc<T>) -> Result<Option<T>, LoadError> {
        let _ = previous;
        self.load(key).await
    }

    /// Returns whether an expired value must be reloaded.
    ///
    /// Returning `false` revalidates the cached value as-is. The default
    /// always reloads.
    fn is_modified(&self, key: &K, value: &T) -> bool {
        let _ = (key, value);
        true
    }

    /// Releases a value evicted from the cache. Best effort: failures are
    /// logged by the store and otherwise ignored.
    fn dispose(&self, value: &T) -> Result<(), LoadError> {
        let _ = value;
        Ok(())
    }

    /// Returns the name of this source, used for logging.
    fn name(&self) -> &str;
}
