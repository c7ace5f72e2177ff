//! Configuration for the plan service client.
//!
//! The client never reads process-wide state on its own: a [`ClientConfig`]
//! is built up front (usually from the environment) and handed to
//! [`crate::client::HttpPlanClient::new`].

use std::env;
use std::time::Duration;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:9080/v1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const SERVICE_URL_ENV: &str = "PLANS_URL";
// Older deployments configured the service through OB_URL.
pub const LEGACY_SERVICE_URL_ENV: &str = "OB_URL";
pub const TIMEOUT_ENV: &str = "PLANS_TIMEOUT_MS";
pub const TOKEN_ENV: &str = "PLANS_TOKEN";

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub service_url: String,
    pub timeout: Duration,
    /// Bearer token sent with every request, if any.
    pub token: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("service_url", &self.service_url)
            .field("timeout", &self.timeout)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            token: None,
        }
    }
}

impl ClientConfig {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            ..Self::default()
        }
    }

    /// Reads the process environment. Call `dotenvy::dotenv()` first if a
    /// `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_service_url(None)
    }

    /// Like [`ClientConfig::from_env`], but `service_url` (usually a command
    /// line flag) replaces the URL from the environment before validation.
    pub fn from_env_with_service_url(service_url: Option<&str>) -> Result<Self, ConfigError> {
        Self::from_lookup_with_service_url(|key| env::var(key).ok(), service_url)
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup_with_service_url(lookup, None)
    }

    pub fn from_lookup_with_service_url<F>(
        lookup: F,
        service_url: Option<&str>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let service_url = service_url
            .map(str::to_string)
            .or_else(|| non_empty(SERVICE_URL_ENV))
            .or_else(|| non_empty(LEGACY_SERVICE_URL_ENV))
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());

        let timeout_ms = match non_empty(TIMEOUT_ENV) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                field: TIMEOUT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_TIMEOUT_MS,
        };

        let config = Self {
            service_url,
            timeout: Duration::from_millis(timeout_ms),
            token: non_empty(TOKEN_ENV),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.service_url.trim();
        if url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "service_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "service_url",
                reason: format!("{url:?} is not an http(s) url"),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "timeout",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Service URL without trailing slashes, ready for path joining.
    pub fn base_url(&self) -> &str {
        self.service_url.trim().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url(), "http://localhost:9080/v1");
    }

    #[test]
    fn plans_url_beats_legacy_ob_url() {
        let config = ClientConfig::from_lookup(lookup(&[("OB_URL", "http://legacy/v1")])).unwrap();
        assert_eq!(config.service_url, "http://legacy/v1");

        let config = ClientConfig::from_lookup(lookup(&[
            ("OB_URL", "http://legacy/v1"),
            ("PLANS_URL", "https://plans.example.com/v2/"),
        ]))
        .unwrap();
        assert_eq!(config.base_url(), "https://plans.example.com/v2");
    }

    #[test]
    fn flag_url_replaces_invalid_environment_url() {
        let env = lookup(&[("PLANS_URL", "ftp://plans"), ("PLANS_TOKEN", "secret")]);
        let config =
            ClientConfig::from_lookup_with_service_url(&env, Some("http://override/v1")).unwrap();
        assert_eq!(config.service_url, "http://override/v1");
        assert_eq!(config.token.as_deref(), Some("secret"));

        assert!(ClientConfig::from_lookup_with_service_url(&env, None).is_err());
        assert!(ClientConfig::from_lookup_with_service_url(lookup(&[]), Some("not a url")).is_err());
    }

    #[test]
    fn reads_timeout_and_token() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("PLANS_TIMEOUT_MS", "1500"),
            ("PLANS_TOKEN", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert!(!format!("{config:?}").contains("secret"));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(ClientConfig::from_lookup(lookup(&[("PLANS_TIMEOUT_MS", "soon")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("PLANS_TIMEOUT_MS", "0")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("PLANS_URL", "ftp://plans")])).is_err());
        assert!(ClientConfig::new("").validate().is_err());
    }
}
