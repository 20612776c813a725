use crate::{Error, Result};
use std::time::Duration;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,  // remote store over the redis protocol
    Memory, // in-process emulation, for local runs and tests
}

impl TryFrom<&str> for StoreBackend {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(Error::Config(format!("unknown store backend '{other}'"))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_url: String,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            redis_url: Self::DEFAULT_REDIS_URL.to_string(),
            connect_timeout: Duration::from_millis(Self::DEFAULT_CONNECT_TIMEOUT_MS),
            response_timeout: Duration::from_millis(Self::DEFAULT_RESPONSE_TIMEOUT_MS),
        }
    }
}

impl StoreConfig {
    const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
    const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;
    const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 1_000;

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = match lookup("NIMBUS_STORE") {
            Some(raw) => StoreBackend::try_from(raw.as_str())?,
            None => StoreBackend::Redis,
        };

        Ok(Self {
            backend,
            redis_url: lookup("NIMBUS_REDIS_URL")
                .unwrap_or_else(|| Self::DEFAULT_REDIS_URL.to_string()),
            connect_timeout: Duration::from_millis(millis_or_default(
                &lookup,
                "NIMBUS_CONNECT_TIMEOUT_MS",
                Self::DEFAULT_CONNECT_TIMEOUT_MS,
            )),
            response_timeout: Duration::from_millis(millis_or_default(
                &lookup,
                "NIMBUS_RESPONSE_TIMEOUT_MS",
                Self::DEFAULT_RESPONSE_TIMEOUT_MS,
            )),
        })
    }
}

fn millis_or_default(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u64) -> u64 {
    match lookup(name) {
        Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            warn!("{name}='{raw}' is not a number of milliseconds, using {default}");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = StoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.backend, StoreBackend::Redis);
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.response_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_overrides_are_read() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            ("NIMBUS_STORE", "Memory"),
            ("NIMBUS_REDIS_URL", "redis://cache:6380/2"),
            ("NIMBUS_RESPONSE_TIMEOUT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.redis_url, "redis://cache:6380/2");
        assert_eq!(config.response_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_bad_timeout_falls_back() {
        let config =
            StoreConfig::from_lookup(lookup_from(&[("NIMBUS_CONNECT_TIMEOUT_MS", "soon")]))
                .unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_unknown_backend_is_config_error() {
        let result = StoreConfig::from_lookup(lookup_from(&[("NIMBUS_STORE", "memcached")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
