//! Configuration for Bare Metal API clients.

use crate::client::{ClientConfig, RetryPolicy, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL};
use crate::endpoint::Endpoint;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// API microversion requested when none is configured.
pub const DEFAULT_API_VERSION: &str = "1.9";

/// Configuration for an Ironic client instance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IronicClientConfig {
    /// Bare Metal API endpoint (e.g. `http://ironic.example.com:6385`)
    #[validate(url)]
    pub endpoint: String,

    /// Requested API microversion, sent as `X-OpenStack-Ironic-API-Version`
    #[serde(default = "default_api_version")]
    pub api_version: Option<String>,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries on conflict or unavailable responses
    #[validate(range(min = 0, max = 10))]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Seconds between retries
    #[validate(range(min = 0, max = 60))]
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

#[allow(clippy::unnecessary_wraps)]
fn default_api_version() -> Option<String> {
    Some(DEFAULT_API_VERSION.to_string())
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_retry_interval_secs() -> u64 {
    DEFAULT_RETRY_INTERVAL
}

impl IronicClientConfig {
    /// Create a new client configuration for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] if the URL is invalid or a value is
    /// out of range.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            endpoint: endpoint.into(),
            ..Self::default()
        };

        config.validate()?;

        Ok(config)
    }

    /// Set the requested API microversion (`None` lets the server pick).
    #[must_use]
    pub fn with_api_version(mut self, version: Option<impl Into<String>>) -> Self {
        self.api_version = version.map(Into::into);
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set maximum retry attempts.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the interval between retries in seconds.
    #[must_use]
    pub const fn with_retry_interval(mut self, seconds: u64) -> Self {
        self.retry_interval_secs = seconds;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy described by this configuration.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_retries, Duration::from_secs(self.retry_interval_secs))
    }

    /// HTTP settings described by this configuration.
    #[must_use]
    pub const fn client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_timeout(self.timeout())
            .with_retry_policy(self.retry_policy())
            .with_tls_verify(self.tls_verify)
    }

    /// Parse the endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be used as a base URL.
    pub fn endpoint(&self) -> Result<Endpoint, Error> {
        Endpoint::parse(&self.endpoint)
    }
}

impl Default for IronicClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:6385".to_string(),
            api_version: default_api_version(),
            tls_verify: default_tls_verify(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}
