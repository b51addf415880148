//! Token state
//!
//! This module holds the access/refresh token pair returned by the token
//! endpoint together with the instants at which each token stops being
//! usable. Expiry instants are computed when a token response is accepted, as
//! `now + ttl` using the ttl echoed by the server. When the server omits a ttl
//! (or sends something that is not a non-negative number) the configured
//! [`TokenTtl`] for that token is used instead.
//!
//! # Example
//!
//! ```rust
//! use rcsdk::auth::{AuthState, AuthStatus, TokenResponse, TokenTtl};
//!
//! let response: TokenResponse = serde_json::from_value(serde_json::json!({
//!     "access_token": "A",
//!     "refresh_token": "B",
//!     "token_type": "bearer",
//!     "expires_in": 3600,
//!     "refresh_token_expires_in": "604800"
//! }))
//! .unwrap();
//!
//! let mut state = AuthState::new();
//! state.set_from_auth_response(&response, &TokenTtl::default());
//! assert_eq!(state.status(), AuthStatus::Authorized);
//! assert_eq!(state.access_token(), "A");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Requested token lifetimes
///
/// Sent as `access_token_ttl` / `refresh_token_ttl` on every token request and
/// used as the expiry fallback when a response lacks a usable ttl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtl {
    /// Access token lifetime
    pub access: Duration,
    /// Refresh token lifetime
    pub refresh: Duration,
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self {
            // 60 minutes
            access: Duration::from_secs(3600),
            // 1 week
            refresh: Duration::from_secs(604_800),
        }
    }
}

impl TokenTtl {
    /// Create a ttl pair
    pub fn new(access: Duration, refresh: Duration) -> Self {
        Self { access, refresh }
    }
}

// =============================================================================
// Token Response
// =============================================================================

/// Decoded body of the token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,
    /// Refresh token
    pub refresh_token: String,
    /// Token type (e.g. "bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Access token ttl in seconds
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub expires_in: Option<u64>,
    /// Refresh token ttl in seconds
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub refresh_token_expires_in: Option<u64>,
    /// Granted scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Account owner id
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub owner_id: Option<String>,
    /// Endpoint id
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub endpoint_id: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Accepts `3600`, `"3600"`, null or anything else; only non-negative
/// integers survive.
fn lenient_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

impl TokenResponse {
    /// Decode a raw token-endpoint body
    ///
    /// Anything that is not a JSON object carrying both tokens, non-empty, is
    /// reported as [`Error::MalformedResponse`].
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let token: Self =
            serde_json::from_slice(body).map_err(|e| Error::MalformedResponse(e.to_string()))?;
        token.validate()
    }

    /// Decode a flat string map, as produced by loosely-typed JSON decoders
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self> {
        let value = serde_json::to_value(fields)?;
        let token: Self =
            serde_json::from_value(value).map_err(|e| Error::MalformedResponse(e.to_string()))?;
        token.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.access_token.is_empty() {
            return Err(Error::MalformedResponse("empty access_token".to_string()));
        }
        if self.refresh_token.is_empty() {
            return Err(Error::MalformedResponse("empty refresh_token".to_string()));
        }
        Ok(self)
    }
}

// =============================================================================
// Auth State
// =============================================================================

/// Position of an [`AuthState`] in the session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// No tokens
    Unauthenticated,
    /// Access token valid
    Authorized,
    /// Access token expired, refresh token still valid
    AccessExpired,
    /// Both tokens expired; only `authorize` can recover
    FullyExpired,
}

/// Mutable token holder owned by one [`Platform`](crate::Platform)
///
/// A fresh state is unauthenticated: all tokens are empty and neither validity
/// check passes. Accessors never fail; they return empty strings while
/// unauthenticated.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    access_token: String,
    access_token_expires_at: Option<DateTime<Utc>>,
    refresh_token: String,
    refresh_token_expires_at: Option<DateTime<Utc>>,
    token_type: String,
    scope: Option<String>,
    owner_id: Option<String>,
    endpoint_id: Option<String>,
}

impl AuthState {
    /// Create an unauthenticated state
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole state from a token response, using the current time
    pub fn set_from_auth_response(&mut self, response: &TokenResponse, fallback: &TokenTtl) {
        self.set_from_auth_response_at(response, fallback, Utc::now());
    }

    /// Replace the whole state from a token response accepted at `now`
    pub fn set_from_auth_response_at(
        &mut self,
        response: &TokenResponse,
        fallback: &TokenTtl,
        now: DateTime<Utc>,
    ) {
        let access_ttl = response.expires_in.unwrap_or(fallback.access.as_secs());
        let refresh_ttl = response
            .refresh_token_expires_in
            .unwrap_or(fallback.refresh.as_secs());

        *self = Self {
            access_token: response.access_token.clone(),
            access_token_expires_at: Some(expiry_after(now, access_ttl)),
            refresh_token: response.refresh_token.clone(),
            refresh_token_expires_at: Some(expiry_after(now, refresh_ttl)),
            token_type: response.token_type.clone(),
            scope: response.scope.clone(),
            owner_id: response.owner_id.clone(),
            endpoint_id: response.endpoint_id.clone(),
        };
    }

    /// Reset to unauthenticated
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Check the access token against the current time
    pub fn is_access_token_valid(&self) -> bool {
        self.is_access_token_valid_at(Utc::now())
    }

    /// Check the access token against `now`
    pub fn is_access_token_valid_at(&self, now: DateTime<Utc>) -> bool {
        is_live(&self.access_token, self.access_token_expires_at, now)
    }

    /// Check the refresh token against the current time
    pub fn is_refresh_token_valid(&self) -> bool {
        self.is_refresh_token_valid_at(Utc::now())
    }

    /// Check the refresh token against `now`
    pub fn is_refresh_token_valid_at(&self, now: DateTime<Utc>) -> bool {
        is_live(&self.refresh_token, self.refresh_token_expires_at, now)
    }

    /// Lifecycle position at the current time
    pub fn status(&self) -> AuthStatus {
        self.status_at(Utc::now())
    }

    /// Lifecycle position at `now`
    pub fn status_at(&self, now: DateTime<Utc>) -> AuthStatus {
        if self.is_access_token_valid_at(now) {
            AuthStatus::Authorized
        } else if self.access_token.is_empty() && self.refresh_token.is_empty() {
            AuthStatus::Unauthenticated
        } else if self.is_refresh_token_valid_at(now) {
            AuthStatus::AccessExpired
        } else {
            AuthStatus::FullyExpired
        }
    }

    /// Get the access token (empty when unauthenticated)
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Get the refresh token (empty when unauthenticated)
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Get the token type (empty when unauthenticated)
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Instant the access token stops being valid
    pub fn access_token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.access_token_expires_at
    }

    /// Instant the refresh token stops being valid
    pub fn refresh_token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.refresh_token_expires_at
    }

    /// Granted scope, if the server reported one
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Account owner id, if the server reported one
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// Endpoint id, if the server reported one
    pub fn endpoint_id(&self) -> Option<&str> {
        self.endpoint_id.as_deref()
    }

    /// Scheme for the `authorization` header of business calls
    pub fn authorization_scheme(&self) -> &str {
        if self.token_type.is_empty() || self.token_type.eq_ignore_ascii_case("bearer") {
            "Bearer"
        } else {
            &self.token_type
        }
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("has_access_token", &!self.access_token.is_empty())
            .field("access_token_expires_at", &self.access_token_expires_at)
            .field("has_refresh_token", &!self.refresh_token.is_empty())
            .field("refresh_token_expires_at", &self.refresh_token_expires_at)
            .field("token_type", &self.token_type)
            .field("owner_id", &self.owner_id)
            .finish()
    }
}

fn is_live(token: &str, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    !token.is_empty() && expires_at.is_some_and(|expires_at| now < expires_at)
}

fn expiry_after(now: DateTime<Utc>, ttl_seconds: u64) -> DateTime<Utc> {
    i64::try_from(ttl_seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
