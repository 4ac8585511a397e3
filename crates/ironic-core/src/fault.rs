//! Mapping of error responses to typed API errors.
//!
//! The Bare Metal API reports failures as
//! `{"error_message": "<json>"}`, where the inner document carries a
//! `faultstring` and an optional `debuginfo` traceback. [`ApiError::from_response`]
//! turns a status code and such a body into an [`ApiError`]; it never fails; an
//! undecodable body yields a generic `"<Kind> (HTTP <code>)"` message.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Error kind selected from the HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpErrorKind {
    /// 300
    MultipleChoices,
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 405
    MethodNotAllowed,
    /// 406
    NotAcceptable,
    /// 408
    RequestTimeout,
    /// 409
    Conflict,
    /// 410
    Gone,
    /// 412
    PreconditionFailed,
    /// 413
    OverLimit,
    /// 415
    UnsupportedMediaType,
    /// 422
    UnprocessableEntity,
    /// 429
    TooManyRequests,
    /// 500
    InternalServerError,
    /// 501
    NotImplemented,
    /// 502
    BadGateway,
    /// 503
    ServiceUnavailable,
    /// 504
    GatewayTimeout,
    /// Any other status code
    Other(u16),
}

impl HttpErrorKind {
    /// Select the kind for a status code.
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            300 => Self::MultipleChoices,
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            406 => Self::NotAcceptable,
            408 => Self::RequestTimeout,
            409 => Self::Conflict,
            410 => Self::Gone,
            412 => Self::PreconditionFailed,
            413 => Self::OverLimit,
            415 => Self::UnsupportedMediaType,
            422 => Self::UnprocessableEntity,
            429 => Self::TooManyRequests,
            500 => Self::InternalServerError,
            501 => Self::NotImplemented,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            504 => Self::GatewayTimeout,
            other => Self::Other(other),
        }
    }

    /// The status code this kind stands for.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::MultipleChoices => 300,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::NotAcceptable => 406,
            Self::RequestTimeout => 408,
            Self::Conflict => 409,
            Self::Gone => 410,
            Self::PreconditionFailed => 412,
            Self::OverLimit => 413,
            Self::UnsupportedMediaType => 415,
            Self::UnprocessableEntity => 422,
            Self::TooManyRequests => 429,
            Self::InternalServerError => 500,
            Self::NotImplemented => 501,
            Self::BadGateway => 502,
            Self::ServiceUnavailable => 503,
            Self::GatewayTimeout => 504,
            Self::Other(code) => code,
        }
    }

    /// Name used in generic error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MultipleChoices => "HTTPMultipleChoices",
            Self::BadRequest => "HTTPBadRequest",
            Self::Unauthorized => "HTTPUnauthorized",
            Self::Forbidden => "HTTPForbidden",
            Self::NotFound => "HTTPNotFound",
            Self::MethodNotAllowed => "HTTPMethodNotAllowed",
            Self::NotAcceptable => "HTTPNotAcceptable",
            Self::RequestTimeout => "HTTPRequestTimeout",
            Self::Conflict => "HTTPConflict",
            Self::Gone => "HTTPGone",
            Self::PreconditionFailed => "HTTPPreconditionFailed",
            Self::OverLimit => "HTTPOverLimit",
            Self::UnsupportedMediaType => "HTTPUnsupportedMediaType",
            Self::UnprocessableEntity => "HTTPUnprocessableEntity",
            Self::TooManyRequests => "HTTPTooManyRequests",
            Self::InternalServerError => "HTTPInternalServerError",
            Self::NotImplemented => "HTTPNotImplemented",
            Self::BadGateway => "HTTPBadGateway",
            Self::ServiceUnavailable => "HTTPServiceUnavailable",
            Self::GatewayTimeout => "HTTPGatewayTimeout",
            Self::Other(_) => "HTTPException",
        }
    }
}

impl fmt::Display for HttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded fault document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Fault {
    /// Short error summary
    #[serde(default)]
    pub faultstring: Option<String>,
    /// Optional traceback
    #[serde(default)]
    pub debuginfo: Option<String>,
}

#[derive(Deserialize)]
struct Envelope {
    error_message: Option<Value>,
}

impl Fault {
    /// Decode a fault from a raw response body.
    ///
    /// `error_message` is normally a JSON-encoded string; newer services send
    /// the object directly. Returns `None` when nothing usable is found.
    #[must_use]
    pub fn decode(body: &[u8]) -> Option<Self> {
        let envelope: Envelope = serde_json::from_slice(body).ok()?;
        match envelope.error_message? {
            Value::String(raw) => serde_json::from_str(&raw).ok(),
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    /// Human readable message, if the fault string is non-empty.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        let fault = self.faultstring.as_deref().filter(|s| !s.is_empty())?;
        match self.debuginfo.as_deref().filter(|s| !s.is_empty()) {
            Some(trace) => Some(format!("{fault}\n{trace}")),
            None => Some(fault.to_string()),
        }
    }
}

/// Error returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    kind: HttpErrorKind,
    message: String,
}

impl ApiError {
    /// Create an error with an explicit message.
    pub fn new(kind: HttpErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build the error for a failed response.
    ///
    /// `content_type` is only used for diagnostics; decoding is attempted
    /// regardless of what the server claims.
    #[must_use]
    pub fn from_response(status: u16, body: Option<&[u8]>, content_type: Option<&str>) -> Self {
        let kind = HttpErrorKind::from_code(status);
        let message = body
            .filter(|b| !b.is_empty())
            .and_then(Fault::decode)
            .and_then(|fault| fault.message());

        match message {
            Some(message) => Self { kind, message },
            None => {
                debug!(status, ?content_type, "no usable fault in error response");
                Self {
                    kind,
                    message: format!("{} (HTTP {})", kind.name(), kind.code()),
                }
            }
        }
    }

    /// The error kind.
    #[must_use]
    pub const fn kind(&self) -> HttpErrorKind {
        self.kind
    }

    /// The HTTP status code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.kind.code()
    }

    /// The mapped message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the failed request may succeed when repeated.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            HttpErrorKind::Conflict | HttpErrorKind::ServiceUnavailable
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn error_body(faultstring: Option<&str>, debuginfo: Option<&str>) -> Vec<u8> {
        let inner = json!({ "faultstring": faultstring, "debuginfo": debuginfo }).to_string();
        json!({ "error_message": inner }).to_string().into_bytes()
    }

    #[test]
    fn fault_string_only() {
        let body = error_body(Some("boom"), None);
        let err = ApiError::from_response(500, Some(&body), Some("application/json"));
        assert_eq!(err.kind(), HttpErrorKind::InternalServerError);
        assert_eq!(err.code(), 500);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn fault_string_and_traceback() {
        let trace = "\"Traceback (most recent call last):\\n\\n  File \\\"/usr/lib/...";
        let body = error_body(Some("another test error"), Some(trace));
        let err = ApiError::from_response(500, Some(&body), Some("application/json"));
        assert_eq!(err.to_string(), format!("another test error\n{trace}"));
    }

    #[test]
    fn null_fields_fall_back_to_generic_message() {
        let body = error_body(None, None);
        let err = ApiError::from_response(500, Some(&body), Some("application/json"));
        assert_eq!(err.to_string(), "HTTPInternalServerError (HTTP 500)");
    }

    #[test]
    fn absent_and_empty_bodies() {
        assert_eq!(
            ApiError::from_response(500, None, None).to_string(),
            "HTTPInternalServerError (HTTP 500)"
        );
        assert_eq!(
            ApiError::from_response(404, Some(b""), None).to_string(),
            "HTTPNotFound (HTTP 404)"
        );
    }

    #[test]
    fn malformed_body_falls_back() {
        let err = ApiError::from_response(409, Some(b"<html>conflict</html>"), Some("text/html"));
        assert_eq!(err.kind(), HttpErrorKind::Conflict);
        assert_eq!(err.to_string(), "HTTPConflict (HTTP 409)");

        let inner_not_json = json!({ "error_message": "plain words" }).to_string();
        let err = ApiError::from_response(400, Some(inner_not_json.as_bytes()), None);
        assert_eq!(err.to_string(), "HTTPBadRequest (HTTP 400)");
    }

    #[test]
    fn empty_fault_string_ignores_debuginfo() {
        let body = error_body(Some(""), Some("trace"));
        let err = ApiError::from_response(500, Some(&body), None);
        assert_eq!(err.to_string(), "HTTPInternalServerError (HTTP 500)");
    }

    #[test]
    fn empty_debuginfo_is_not_appended() {
        let body = error_body(Some("boom"), Some(""));
        let err = ApiError::from_response(500, Some(&body), None);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn error_message_as_object() {
        let body = json!({
            "error_message": { "faultstring": "Node abc could not be found.", "debuginfo": null }
        })
        .to_string();
        let err = ApiError::from_response(404, Some(body.as_bytes()), None);
        assert_eq!(err.kind(), HttpErrorKind::NotFound);
        assert_eq!(err.to_string(), "Node abc could not be found.");
    }

    #[test]
    fn unknown_status_uses_generic_kind() {
        let err = ApiError::from_response(418, None, None);
        assert_eq!(err.kind(), HttpErrorKind::Other(418));
        assert_eq!(err.code(), 418);
        assert_eq!(err.to_string(), "HTTPException (HTTP 418)");
    }

    #[test]
    fn kinds_round_trip_through_codes() {
        for code in [
            300, 400, 401, 403, 404, 405, 406, 408, 409, 410, 412, 413, 415, 422, 429, 500, 501,
            502, 503, 504,
        ] {
            let kind = HttpErrorKind::from_code(code);
            assert!(!matches!(kind, HttpErrorKind::Other(_)), "{code} has no variant");
            assert_eq!(kind.code(), code);
        }
    }

    #[test]
    fn retryable_kinds() {
        assert!(ApiError::from_response(409, None, None).is_retryable());
        assert!(ApiError::from_response(503, None, None).is_retryable());
        assert!(!ApiError::from_response(500, None, None).is_retryable());
        assert!(!ApiError::from_response(404, None, None).is_retryable());
    }
}
