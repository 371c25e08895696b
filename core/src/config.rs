//! Store configuration.
//!
//! `StoreConfig` can be built in code, deserialized from a host-provided
//! JSON document, or read from `TODO_*` environment variables.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CREDENTIAL_KEY: &str = "token";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_API_URL: &str = "TODO_API_URL";
pub const ENV_CREDENTIAL_KEY: &str = "TODO_CREDENTIAL_KEY";
pub const ENV_EMPTY_FETCH: &str = "TODO_EMPTY_FETCH";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "TODO_REQUEST_TIMEOUT_SECS";

/// What a successful fetch does when the service returns no items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyFetchPolicy {
    /// The local collection becomes empty, mirroring the server.
    #[default]
    Replace,
    /// The local collection is left as it was.
    KeepExisting,
}

impl std::str::FromStr for EmptyFetchPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "keep-existing" | "keep_existing" => Ok(Self::KeepExisting),
            other => Err(ConfigError::Invalid {
                name: ENV_EMPTY_FETCH,
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Service root, e.g. `http://192.168.1.102:5000`. Paths such as
    /// `/api/login` are appended to it.
    pub base_url: String,
    /// Key under which the session token is persisted.
    pub credential_key: String,
    pub empty_fetch: EmptyFetchPolicy,
    /// Applied by transports that support it. `None` waits indefinitely.
    #[serde(deserialize_with = "timeout_secs::deserialize")]
    pub request_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            credential_key: DEFAULT_CREDENTIAL_KEY.to_string(),
            empty_fetch: EmptyFetchPolicy::default(),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

impl StoreConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_empty_fetch(mut self, policy: EmptyFetchPolicy) -> Self {
        self.empty_fetch = policy;
        self
    }

    pub fn with_credential_key(mut self, key: &str) -> Self {
        self.credential_key = key.to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(ENV_API_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_API_URL))?;
        let mut config = Self::new(base_url.trim());

        if let Some(key) = lookup(ENV_CREDENTIAL_KEY) {
            if key.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    name: ENV_CREDENTIAL_KEY,
                    value: key,
                });
            }
            config.credential_key = key.trim().to_string();
        }
        if let Some(policy) = lookup(ENV_EMPTY_FETCH) {
            config.empty_fetch = policy.parse()?;
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| ConfigError::Invalid {
                name: ENV_REQUEST_TIMEOUT_SECS,
                value: secs.clone(),
            })?;
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        Ok(config)
    }
}

mod timeout_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    // 0 or null disables the timeout.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.filter(|s| *s > 0).map(Duration::from_secs))
    }
}
