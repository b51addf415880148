//! Platform - session and request dispatch
//!
//! The [`Platform`] owns the application [`Credentials`] and the only
//! [`AuthState`] of a session. It drives the token lifecycle (authorize,
//! refresh, logout) and exposes the verb-level API (`get`/`post`/`put`/
//! `delete`) every endpoint helper goes through.
//!
//! # Example
//!
//! ```rust,no_run
//! use rcsdk::{Credentials, Platform};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let platform = Platform::new(Credentials::sandbox("app-key", "app-secret"))?;
//!
//!     platform.authorize("16505550100", "101", "password").await?;
//!     platform.ensure_authorized().await?;
//!
//!     let calls = platform.call_log().await?;
//!     println!("{}", calls.text());
//!
//!     platform.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency
//!
//! Every call is an independent future. The verbs do not refresh tokens on
//! their own: a caller that needs a valid token awaits
//! [`Platform::ensure_authorized`] first. Token updates replace the whole
//! [`AuthState`] under a write lock, and the auth flows themselves are
//! serialized, so a reader never observes a half-updated token set.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::auth::{AuthState, AuthStatus, TokenResponse, TokenTtl};
use crate::credentials::Credentials;
use crate::http::{
    ApiResponse, HttpMethod, HttpRequest, HttpTransport, ReqwestTransport, TransportConfig,
    TransportError,
};
use crate::request::{
    ApiRequest, RequestBody, UrlBuilder, UrlOptions, DEFAULT_ACCOUNT, REVOKE_ENDPOINT,
    TOKEN_ENDPOINT,
};
use crate::{Error, Result};

/// Configuration for [`Platform`]
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Account id substituted for `~` in `/account/~`
    pub account: String,
    /// Requested token lifetimes, also the expiry fallback
    pub token_ttl: TokenTtl,
    /// Upper bound for token and revoke calls
    pub auth_timeout: Option<Duration>,
    /// Settings for the default reqwest transport
    pub transport: TransportConfig,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            account: DEFAULT_ACCOUNT.to_string(),
            token_ttl: TokenTtl::default(),
            auth_timeout: None,
            transport: TransportConfig::default(),
        }
    }
}

impl PlatformConfig {
    /// Create a default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the account id
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    /// Set the requested token lifetimes
    pub fn with_token_ttl(mut self, token_ttl: TokenTtl) -> Self {
        self.token_ttl = token_ttl;
        self
    }

    /// Bound token and revoke calls
    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = Some(timeout);
        self
    }

    /// Set transport configuration
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }
}

/// Authenticated session against one server
pub struct Platform {
    credentials: Credentials,
    config: PlatformConfig,
    urls: UrlBuilder,
    transport: Arc<dyn HttpTransport>,
    auth: RwLock<AuthState>,
    /// Serializes authorize/refresh/logout
    auth_flow: Mutex<()>,
}

impl Platform {
    /// Create a platform with default configuration
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_config(credentials, PlatformConfig::default())
    }

    /// Create a platform backed by a [`ReqwestTransport`]
    pub fn with_config(credentials: Credentials, config: PlatformConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.transport.clone())?;
        Ok(Self::with_transport(credentials, config, Arc::new(transport)))
    }

    /// Create a platform over a caller-provided transport
    pub fn with_transport(
        credentials: Credentials,
        config: PlatformConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let urls = UrlBuilder::new(credentials.server(), config.account.clone());
        Self {
            credentials,
            config,
            urls,
            transport,
            auth: RwLock::new(AuthState::new()),
            auth_flow: Mutex::new(()),
        }
    }

    /// Get the application credentials
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Get the configuration
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Base64 `appKey:appSecret`
    pub fn api_key(&self) -> String {
        self.credentials.api_key()
    }

    // =========================================================================
    // Auth state access
    // =========================================================================

    /// Snapshot of the current auth state
    pub async fn auth_data(&self) -> AuthState {
        self.auth.read().await.clone()
    }

    /// Replace the auth state from an already decoded token response
    pub async fn set_auth_data(&self, response: &TokenResponse) {
        let _flow = self.auth_flow.lock().await;
        self.auth
            .write()
            .await
            .set_from_auth_response(response, &self.config.token_ttl);
    }

    /// Current access token (empty when unauthenticated)
    pub async fn access_token(&self) -> String {
        self.auth.read().await.access_token().to_string()
    }

    /// Current lifecycle position
    pub async fn status(&self) -> AuthStatus {
        self.auth.read().await.status()
    }

    /// Build a URL for `path` using the current access token
    pub async fn create_url(&self, path: &str, options: UrlOptions) -> String {
        let auth = self.auth.read().await;
        self.urls.build(path, &options, auth.access_token())
    }

    // =========================================================================
    // Auth flows
    // =========================================================================

    /// Obtain tokens with the password grant
    ///
    /// On success the auth state is replaced and the raw token response is
    /// returned. On failure the auth state is left as it was. An empty
    /// `extension` is omitted from the request.
    pub async fn authorize(
        &self,
        username: &str,
        extension: &str,
        password: &str,
    ) -> Result<ApiResponse> {
        let _flow = self.auth_flow.lock().await;

        let mut form = vec![
            ("grant_type", "password".to_string()),
            ("username", username.to_string()),
        ];
        if !extension.is_empty() {
            form.push(("extension", extension.to_string()));
        }
        form.push(("password", password.to_string()));
        form.extend(self.ttl_fields());

        let response = self.token_request(form).await.inspect_err(|e| {
            tracing::warn!(error = %e, "authorization failed");
        })?;
        self.accept_token_response(&response).await?;

        tracing::info!("session authorized");
        Ok(response)
    }

    /// Exchange the refresh token for a new token pair
    ///
    /// Fails with [`Error::SessionExpired`] without touching the network when
    /// the refresh token is no longer valid.
    pub async fn refresh(&self) -> Result<ApiResponse> {
        let _flow = self.auth_flow.lock().await;
        self.refresh_locked().await
    }

    /// Make sure the access token is usable, refreshing it if needed
    ///
    /// Any refresh failure is reported as [`Error::SessionExpired`]; the
    /// caller has to `authorize` again. The failed refresh is kept as the
    /// error's cause (see [`Error::refresh_cause`]).
    pub async fn ensure_authorized(&self) -> Result<()> {
        if self.auth.read().await.is_access_token_valid() {
            return Ok(());
        }

        let _flow = self.auth_flow.lock().await;
        // another caller may have refreshed while we waited for the lock
        if self.auth.read().await.is_access_token_valid() {
            return Ok(());
        }

        match self.refresh_locked().await {
            Ok(_) => {}
            Err(e) if e.is_session_expired() => return Err(e),
            Err(e) => {
                return Err(Error::SessionExpired {
                    reason: format!("refresh failed: {}", e),
                    cause: Some(Box::new(e)),
                })
            }
        }

        if self.auth.read().await.is_access_token_valid() {
            Ok(())
        } else {
            Err(Error::session_expired("access token is expired after refresh"))
        }
    }

    /// Revoke the access token and clear the session
    ///
    /// The local state is cleared before the revoke call is sent, so it is
    /// gone whatever the outcome. The revoke outcome is still returned.
    pub async fn logout(&self) -> Result<()> {
        let _flow = self.auth_flow.lock().await;

        let access_token = {
            let mut auth = self.auth.write().await;
            let token = auth.access_token().to_string();
            auth.clear();
            token
        };

        if access_token.is_empty() {
            tracing::debug!("logout without a session; nothing to revoke");
            return Ok(());
        }

        let body = RequestBody::form([("token", access_token)]);
        let request = self.auth_request(REVOKE_ENDPOINT, body)?;
        match self.execute_auth(request).await {
            Ok(_) => {
                tracing::info!("session revoked");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "revoke failed; local session cleared anyway");
                Err(e)
            }
        }
    }

    async fn refresh_locked(&self) -> Result<ApiResponse> {
        let refresh_token = {
            let auth = self.auth.read().await;
            if !auth.is_refresh_token_valid() {
                tracing::debug!("refresh skipped: refresh token is expired");
                return Err(Error::session_expired("refresh token is expired"));
            }
            auth.refresh_token().to_string()
        };

        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token),
        ];
        form.extend(self.ttl_fields());

        let response = self.token_request(form).await.inspect_err(|e| {
            tracing::warn!(error = %e, "token refresh failed");
        })?;
        self.accept_token_response(&response).await?;

        tracing::debug!("access token refreshed");
        Ok(response)
    }

    fn ttl_fields(&self) -> [(&'static str, String); 2] {
        [
            (
                "access_token_ttl",
                self.config.token_ttl.access.as_secs().to_string(),
            ),
            (
                "refresh_token_ttl",
                self.config.token_ttl.refresh.as_secs().to_string(),
            ),
        ]
    }

    async fn token_request(&self, form: Vec<(&str, String)>) -> Result<ApiResponse> {
        let request = self.auth_request(TOKEN_ENDPOINT, RequestBody::form(form))?;
        self.execute_auth(request).await
    }

    /// POST with Basic auth built from the credentials
    fn auth_request(&self, path: &str, body: RequestBody) -> Result<HttpRequest> {
        let url = self.urls.build(path, &UrlOptions::server(), "");
        let mut request = HttpRequest::new(HttpMethod::Post, url);
        request.headers.insert(
            "authorization".to_string(),
            self.credentials.basic_authorization(),
        );
        request
            .headers
            .insert("content-type".to_string(), body.content_type().to_string());
        request.body = Some(body.encode()?);
        Ok(request)
    }

    async fn execute_auth(&self, request: HttpRequest) -> Result<ApiResponse> {
        let pending = self.transport.send(request);
        let response = match self.config.auth_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| TransportError::Timeout)??,
            None => pending.await?,
        };
        ensure_success(response)
    }

    async fn accept_token_response(&self, response: &ApiResponse) -> Result<()> {
        let token = TokenResponse::from_body(response.bytes())?;
        self.auth
            .write()
            .await
            .set_from_auth_response(&token, &self.config.token_ttl);
        Ok(())
    }

    // =========================================================================
    // Verb dispatch
    // =========================================================================

    /// Send a GET request
    pub async fn get(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.send(HttpMethod::Get, request).await
    }

    /// Send a POST request
    pub async fn post(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.send(HttpMethod::Post, request).await
    }

    /// Send a PUT request
    pub async fn put(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.send(HttpMethod::Put, request).await
    }

    /// Send a DELETE request
    pub async fn delete(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.send(HttpMethod::Delete, request).await
    }

    /// Send `request` with `method` and the current bearer token
    ///
    /// Does not check token validity; see [`Platform::ensure_authorized`].
    /// Non-2xx responses become [`Error::HttpStatus`].
    pub async fn send(&self, method: HttpMethod, request: ApiRequest) -> Result<ApiResponse> {
        let path = request.path.clone();
        let http_request = self.build_request(method, request).await?;

        tracing::debug!(method = %http_request.method, path = %path, "dispatching request");
        let response = self.transport.send(http_request).await?;
        ensure_success(response)
    }

    async fn build_request(&self, method: HttpMethod, request: ApiRequest) -> Result<HttpRequest> {
        let (access_token, scheme) = {
            let auth = self.auth.read().await;
            (
                auth.access_token().to_string(),
                auth.authorization_scheme().to_string(),
            )
        };

        let mut options = UrlOptions::server();
        let mut wire_method = method;
        if request.method_override && method != HttpMethod::Post {
            options = options.with_method_override(method);
            wire_method = HttpMethod::Post;
        }
        if request.token_in_query {
            options = options.with_access_token();
        }

        let url = self.urls.build(&request.path, &options, &access_token);
        let mut http_request = HttpRequest::new(wire_method, url);
        http_request.headers = request
            .headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();

        if let Some(body) = &request.body {
            http_request
                .headers
                .entry("content-type".to_string())
                .or_insert_with(|| body.content_type().to_string());
            http_request.body = Some(body.encode()?);
        }

        http_request.headers.insert(
            "authorization".to_string(),
            format!("{} {}", scheme, access_token),
        );
        Ok(http_request)
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("credentials", &self.credentials)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn ensure_success(response: ApiResponse) -> Result<ApiResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(Error::HttpStatus {
            status: response.status(),
            body: response.text(),
        })
    }
}
