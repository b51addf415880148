//! Application identity
//!
//! Credentials are the app key, app secret and server base URL handed out by
//! the developer portal. They never change after construction; the only thing
//! derived from them is the Basic-auth key used on the token and revoke
//! endpoints.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Sandbox server base URL
pub const SANDBOX_SERVER: &str = "https://platform.devtest.ringcentral.com";

/// Production server base URL
pub const PRODUCTION_SERVER: &str = "https://platform.ringcentral.com";

/// Immutable application identity
///
/// # Examples
/// ```
/// use rcsdk::Credentials;
///
/// let credentials = Credentials::new("key", "secret", "https://platform.ringcentral.com");
/// assert_eq!(credentials.api_key(), "a2V5OnNlY3JldA==");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    app_key: String,
    app_secret: String,
    server: String,
}

impl Credentials {
    /// Create credentials for an arbitrary server
    pub fn new(
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            server: server.into(),
        }
    }

    /// Create credentials for the sandbox environment
    pub fn sandbox(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self::new(app_key, app_secret, SANDBOX_SERVER)
    }

    /// Create credentials for the production environment
    pub fn production(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self::new(app_key, app_secret, PRODUCTION_SERVER)
    }

    /// Get the app key
    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    /// Get the server base URL
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Base64 of `appKey:appSecret`
    pub fn api_key(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.app_key, self.app_secret))
    }

    /// Value for the `authorization` header on token and revoke calls
    pub fn basic_authorization(&self) -> String {
        format!("Basic {}", self.api_key())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .field("server", &self.server)
            .finish()
    }
}
