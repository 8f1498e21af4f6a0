//! Cache settings loaded from files and the environment.

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::policy::CachePolicy;

/// Environment variable prefix: `STRATA_CACHE__CACHE_DURATION_MS=60000`.
pub const ENV_PREFIX: &str = "STRATA_CACHE";

/// Deserializable cache settings.
///
/// Durations are given in milliseconds. A negative value means "never", the
/// way operators have always written it in property files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// How long a loaded value stays fresh.
    #[serde(with = "signed_millis")]
    pub cache_duration_ms: Option<Duration>,

    /// How long an entry may stay unread before the sweeper evicts it.
    #[serde(with = "signed_millis")]
    pub dormant_duration_ms: Option<Duration>,

    /// How often the sweeper runs.
    #[serde(with = "signed_millis")]
    pub sweep_interval_ms: Option<Duration>,

    /// Whether an empty load result is memoized.
    pub cache_null_result: bool,

    /// Whether a load failure is memoized.
    pub cache_error_result: bool,

    /// Time budget for a single source call.
    #[serde(with = "signed_millis")]
    pub load_timeout_ms: Option<Duration>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from_policy(&CachePolicy::default())
    }
}

impl CacheSettings {
    /// Loads settings from an optional file, overridden by `STRATA_CACHE__*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidSettings` if the file is missing or a
    /// value cannot be parsed.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_from(file, None)
    }

    /// Like [`load`](Self::load), reading variables from `env` instead of the
    /// process environment when it is given.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidSettings` if the file is missing or a
    /// value cannot be parsed.
    pub fn load_from(file: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .try_parsing(true)
                .source(env),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CacheError::InvalidSettings(e.to_string()))
    }

    /// Captures an existing policy as settings.
    pub fn from_policy(policy: &CachePolicy) -> Self {
        Self {
            cache_duration_ms: policy.cache_duration(),
            dormant_duration_ms: policy.dormant_duration(),
            sweep_interval_ms: Some(policy.sweep_interval()),
            cache_null_result: policy.cache_null_result(),
            cache_error_result: policy.cache_error_result(),
            load_timeout_ms: policy.load_timeout(),
        }
    }

    /// Builds the policy these settings describe.
    pub fn policy(&self) -> CachePolicy {
        let mut builder = CachePolicy::builder()
            .cache_null_result(self.cache_null_result)
            .cache_error_result(self.cache_error_result);

        builder = match self.cache_duration_ms {
            Some(d) => builder.cache_duration(d),
            None => builder.never_expire(),
        };
        builder = match self.dormant_duration_ms {
            Some(d) => builder.dormant_duration(d),
            None => builder.never_dormant(),
        };
        if let Some(interval) = self.sweep_interval_ms {
            builder = builder.sweep_interval(interval);
        }
        if let Some(timeout) = self.load_timeout_ms {
            builder = builder.load_timeout(timeout);
        }

        builder.build()
    }
}

mod signed_millis {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_i64(i64::try_from(d.as_millis()).unwrap_or(i64::MAX)),
            None => serializer.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }
}
