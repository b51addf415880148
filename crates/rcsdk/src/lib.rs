//! RingCentral Platform Client Library
//!
//! This crate implements the authentication/session layer of the RingCentral
//! REST API: OAuth-style token management, request URL construction, and the
//! verb-level request API that every endpoint helper funnels through.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod credentials;
pub mod endpoints;
pub mod http;
pub mod platform;
pub mod request;

#[cfg(test)]
pub(crate) mod test_utils;

pub use auth::{AuthState, AuthStatus, TokenResponse, TokenTtl};
pub use credentials::Credentials;
pub use endpoints::{PhoneNumber, RingOutRequest, SmsRequest};
pub use http::{
    ApiResponse, HttpMethod, HttpRequest, HttpTransport, ReqwestTransport, TransportConfig,
    TransportError,
};
pub use platform::{Platform, PlatformConfig};
pub use request::{ApiRequest, RequestBody, UrlBuilder, UrlOptions};

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for platform operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network or connection failure reported by the HTTP transport
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Response status outside 2xx
    #[error("HTTP error ({status}): {body}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The session cannot be renewed; a fresh `authorize` is required
    ///
    /// `cause` carries the failed refresh when there was one, so a caller can
    /// tell a network outage from a rejected refresh token.
    #[error("Session expired: {reason}")]
    SessionExpired {
        /// Human-readable reason
        reason: String,
        /// Error of the refresh attempt that failed
        #[source]
        cause: Option<Box<Error>>,
    },

    /// A token or revoke response could not be decoded
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the caller has to re-authorize to continue
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired { .. })
    }

    /// Session expired without a refresh attempt behind it
    pub fn session_expired(reason: impl Into<String>) -> Self {
        Error::SessionExpired {
            reason: reason.into(),
            cause: None,
        }
    }

    /// The refresh failure behind a [`Error::SessionExpired`], if any
    pub fn refresh_cause(&self) -> Option<&Error> {
        match self {
            Error::SessionExpired { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }

    /// HTTP status code, if the server answered with a non-2xx status
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let err = Error::session_expired("refresh token expired");
        assert!(err.to_string().contains("Session expired"));
        assert!(err.is_session_expired());
        assert_eq!(err.status(), None);
        assert!(err.refresh_cause().is_none());
    }

    #[test]
    fn test_session_expired_keeps_cause() {
        use std::error::Error as _;

        let err = Error::SessionExpired {
            reason: "refresh failed".to_string(),
            cause: Some(Box::new(TransportError::Timeout.into())),
        };
        assert!(matches!(
            err.refresh_cause(),
            Some(Error::Transport(TransportError::Timeout))
        ));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_http_status_error() {
        let err = Error::HttpStatus {
            status: 401,
            body: "{\"error\":\"invalid_grant\"}".to_string(),
        };
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_session_expired());
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: Error = TransportError::Timeout.into();
        assert!(matches!(err, Error::Transport(TransportError::Timeout)));
    }
}
