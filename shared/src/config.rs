//! Store configuration.
//!
//! Defaults match the development proxy: the backend listens on
//! `http://localhost:8080` and list pages hold 20 entries.

use url::Url;

use crate::capabilities::{
    ValidatedUrl, DEFAULT_TIMEOUT_MS, MAX_RESPONSE_BODY_SIZE, MAX_TIMEOUT_MS,
};
use crate::error::ConfigError;
use crate::{DEFAULT_API_BASE_URL, DEFAULT_LIST_LIMIT};

pub const ENV_API_URL: &str = "TRACKFEEL_API_URL";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "TRACKFEEL_REQUEST_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Always ends with `/` so endpoint paths join beneath it.
    base_url: String,
    request_timeout_ms: u64,
    default_limit: u32,
    max_response_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: format!("{DEFAULT_API_BASE_URL}/"),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            default_limit: DEFAULT_LIST_LIMIT,
            max_response_bytes: MAX_RESPONSE_BODY_SIZE,
        }
    }
}

impl StoreConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Self::default().with_base_url(base_url)
    }

    /// Reads overrides from the environment, falling back to defaults for
    /// anything unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config = config.with_base_url(url.trim())?;
        }

        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_MS).filter(|v| !v.trim().is_empty()) {
            let ms = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: ENV_REQUEST_TIMEOUT_MS,
                    reason: e.to_string(),
                })?;
            config = config.with_request_timeout_ms(ms)?;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        let validated = ValidatedUrl::new(base_url)?;
        let mut url = Url::parse(validated.as_str()).map_err(|e| ConfigError::InvalidValue {
            key: ENV_API_URL,
            reason: e.to_string(),
        })?;
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::InvalidValue {
                key: ENV_API_URL,
                reason: "base URL cannot carry a query or fragment".to_string(),
            });
        }
        // Url::join drops the last segment unless the path ends with a slash.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = url.into();
        Ok(self)
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Result<Self, ConfigError> {
        if timeout_ms == 0 || timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::InvalidValue {
                key: ENV_REQUEST_TIMEOUT_MS,
                reason: format!("must be between 1 and {MAX_TIMEOUT_MS}"),
            });
        }
        self.request_timeout_ms = timeout_ms;
        Ok(self)
    }

    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit;
        self
    }

    /// Caps accepted response bodies; larger responses fail the operation.
    pub fn with_max_response_bytes(mut self, max_bytes: usize) -> Result<Self, ConfigError> {
        if max_bytes == 0 || max_bytes > MAX_RESPONSE_BODY_SIZE {
            return Err(ConfigError::InvalidValue {
                key: "max_response_bytes",
                reason: format!("must be between 1 and {MAX_RESPONSE_BODY_SIZE}"),
            });
        }
        self.max_response_bytes = max_bytes;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout_ms(&self) -> u64 {
        self.request_timeout_ms
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    pub fn max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }
}
