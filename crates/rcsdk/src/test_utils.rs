//! Test utilities and fixtures for platform testing
//!
//! This module provides canned credentials, token bodies and a transport that
//! records every request it is handed.

#![allow(dead_code)] // Not every fixture is used by every test module

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::auth::TokenResponse;
use crate::credentials::Credentials;
use crate::http::{ApiResponse, HttpRequest, HttpTransport, TransportError};
use crate::platform::{Platform, PlatformConfig};

/// Server used by all fixtures
pub const SERVER: &str = "https://platform.example.com";

/// Basic-auth header for [`credentials`] (`key:secret`)
pub const BASIC_AUTH: &str = "Basic a2V5OnNlY3JldA==";

/// Test application credentials
pub fn credentials() -> Credentials {
    Credentials::new("key", "secret", SERVER)
}

/// Token endpoint body with the given tokens and ttls
pub fn token_json(
    access: &str,
    refresh: &str,
    expires_in: u64,
    refresh_expires_in: u64,
) -> serde_json::Value {
    serde_json::json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "expires_in": expires_in.to_string(),
        "refresh_token_expires_in": refresh_expires_in.to_string(),
        "scope": "SMS RingOut ReadCallLog ReadMessages",
        "owner_id": "400131249008"
    })
}

/// Decoded token response
pub fn token_response(
    access: &str,
    refresh: &str,
    expires_in: u64,
    refresh_expires_in: u64,
) -> TokenResponse {
    serde_json::from_value(token_json(access, refresh, expires_in, refresh_expires_in)).unwrap()
}

/// Response carrying a JSON body
pub fn json_response(status: u16, body: serde_json::Value) -> ApiResponse {
    let mut headers = HashMap::new();
    headers.insert("content-type".to_string(), "application/json".to_string());
    ApiResponse::new(status, headers, serde_json::to_vec(&body).unwrap())
}

/// Successful token endpoint response
pub fn token_ok(access: &str, refresh: &str) -> ApiResponse {
    json_response(200, token_json(access, refresh, 3600, 604_800))
}

/// Decode a form-encoded body into a map
pub fn form_fields(request: &HttpRequest) -> HashMap<String, String> {
    url::form_urlencoded::parse(request.body.as_deref().unwrap_or_default())
        .into_owned()
        .collect()
}

/// Transport that records requests and replays queued responses
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the next outcome
    pub fn push(&self, outcome: Result<ApiResponse, TransportError>) {
        self.responses.lock().unwrap().push_back(outcome);
    }

    /// Every request sent so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recent request
    pub fn last(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connection("no response queued".into())))
    }
}

/// Transport that never answers within a minute
pub struct StalledTransport;

#[async_trait]
impl HttpTransport for StalledTransport {
    async fn send(&self, _request: HttpRequest) -> Result<ApiResponse, TransportError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(json_response(200, serde_json::json!({})))
    }
}

/// Platform with default config over `transport`
pub fn platform(transport: Arc<dyn HttpTransport>) -> Platform {
    Platform::with_transport(credentials(), PlatformConfig::default(), transport)
}
