//! Error types for Bare Metal API operations.
//!
//! Remote failures are carried as [`ApiError`] values produced by the fault
//! mapper; everything else (configuration, transport, decoding) has its own
//! variant.

use crate::fault::ApiError;
use thiserror::Error;

/// Main error type for Bare Metal API operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The service answered with a non-success status
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A resource definition referenced fields it does not contain
    #[error(
        "{param} specified with value not contained in field_ids. Unknown value(s): {}",
        .unknown.join(", ")
    )]
    InvalidField {
        /// Name of the offending parameter
        param: &'static str,
        /// Identifiers that were not found
        unknown: Vec<String>,
    },

    /// The service could not be reached
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Failed to decode a service response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid UUID format
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Operation timed out
    #[error("Timeout waiting for service: {0}")]
    Timeout(String),

    /// Request rejected before it was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Specialized result type for Bare Metal API operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Api(_) => "API_ERROR",
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::InvalidUuid(_) => "INVALID_UUID",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
        }
    }

    /// HTTP status of a remote error, if this is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.code()),
            _ => None,
        }
    }

    /// Returns true if the request that produced this error may be retried.
    ///
    /// Timeouts are not retried: the service may already have acted on the
    /// request. A failed connection never reached it, so it is retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(err) => err.is_retryable(),
            Self::ServiceUnavailable(_) => true,
            _ => false,
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub fn should_log(&self) -> bool {
        match self {
            Self::Api(err) => err.code() >= 500,
            Self::ConfigError(_) | Self::InvalidField { .. } => true,
            _ => false,
        }
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
