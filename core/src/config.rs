//! Client configuration: where the API lives and how long a request may take.

use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::transport::DEFAULT_TIMEOUT;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

pub const BASE_URL_ENV: &str = "AISCHOOL_BASE_URL";
pub const TIMEOUT_ENV: &str = "AISCHOOL_TIMEOUT_SECS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?} is not a positive number of seconds")]
    InvalidTimeout { name: &'static str, value: String },

    #[error("invalid {name}: expected an absolute http(s) URL with a host, got {value:?}")]
    InvalidBaseUrl { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `AISCHOOL_BASE_URL` and `AISCHOOL_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup(BASE_URL_ENV) {
            config = config.with_base_url(BASE_URL_ENV, &url)?;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            config.timeout = parse_timeout(TIMEOUT_ENV, &raw)?;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, name: &'static str, url: &str) -> Result<Self, ConfigError> {
        let url = url.trim();
        let valid = Url::parse(url).is_ok_and(|parsed| {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|host| !host.is_empty())
        });
        if !valid {
            return Err(ConfigError::InvalidBaseUrl {
                name,
                value: url.to_string(),
            });
        }
        self.base_url = url.to_string();
        Ok(self)
    }
}

pub fn parse_timeout(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout {
            name,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_overrides() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ClientConfig::from_lookup(|key| match key {
            BASE_URL_ENV => Some("https://api.example.com/".to_string()),
            TIMEOUT_ENV => Some("5".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.base_url, "https://api.example.com/");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn zero_or_garbage_timeout_is_rejected() {
        for raw in ["0", "soon", "-3"] {
            let err = parse_timeout(TIMEOUT_ENV, raw).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidTimeout { .. }), "{raw}");
        }
    }

    #[test]
    fn base_url_needs_a_scheme_and_a_host() {
        for raw in [
            "localhost:5000",
            "http://",
            "https://",
            "http://:5000",
            "ftp://example.com",
            "http://exa mple.com",
            "http://example.com:99999",
        ] {
            let err = ClientConfig::default()
                .with_base_url(BASE_URL_ENV, raw)
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }), "{raw}");
        }
    }

    #[test]
    fn base_url_accepts_a_path_prefix() {
        let config = ClientConfig::default()
            .with_base_url(BASE_URL_ENV, " http://10.0.2.2:5000/school ")
            .unwrap();
        assert_eq!(config.base_url, "http://10.0.2.2:5000/school");
    }
}
