//! Request URL and descriptor assembly
//!
//! [`UrlBuilder`] turns a raw API path into the final request URL:
//!
//! 1. prepend the server base URL (unless the path is already absolute)
//! 2. insert `/restapi/v1.0` when the path lacks the API prefix
//! 3. rewrite the default account segment `/account/~` to the configured account
//! 4. append the path
//! 5. append `_method=<VERB>` and/or `access_token=<token>` query parameters
//!
//! Query parameters are additive: `?` introduces the first one, `&` every
//! subsequent one, an existing query string is never replaced.

use serde::Serialize;
use std::collections::HashMap;
use url::form_urlencoded;

use crate::http::HttpMethod;
use crate::Result;

/// API path prefix
pub const URL_PREFIX: &str = "/restapi";

/// API version inserted after [`URL_PREFIX`]
pub const API_VERSION: &str = "v1.0";

/// Path segment introducing the account id
pub const ACCOUNT_PREFIX: &str = "/account/";

/// Placeholder meaning "the authenticated user's own account"
pub const DEFAULT_ACCOUNT: &str = "~";

/// Token endpoint path
pub const TOKEN_ENDPOINT: &str = "/restapi/oauth/token";

/// Revoke endpoint path
pub const REVOKE_ENDPOINT: &str = "/restapi/oauth/revoke";

// =============================================================================
// URL Building
// =============================================================================

/// Options for [`UrlBuilder::build`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlOptions {
    /// Prepend the server base URL
    pub add_server: bool,
    /// Append `access_token=<token>`
    pub add_access_token: bool,
    /// Append `_method=<VERB>`
    pub add_method_override: Option<HttpMethod>,
}

impl UrlOptions {
    /// Options with only `add_server` set
    pub fn server() -> Self {
        Self {
            add_server: true,
            ..Default::default()
        }
    }

    /// Also append the access token
    pub fn with_access_token(mut self) -> Self {
        self.add_access_token = true;
        self
    }

    /// Also append a method override
    pub fn with_method_override(mut self, method: HttpMethod) -> Self {
        self.add_method_override = Some(method);
        self
    }
}

/// Pure URL builder for one server and account
///
/// # Examples
/// ```
/// use rcsdk::request::{UrlBuilder, UrlOptions};
///
/// let urls = UrlBuilder::new("https://x.example.com", "~");
/// assert_eq!(
///     urls.build("/restapi/v1.0/account/~/call-log", &UrlOptions::server(), ""),
///     "https://x.example.com/restapi/v1.0/account/~/call-log"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    server: String,
    account: String,
}

impl UrlBuilder {
    /// Create a builder; a trailing `/` on the server is ignored
    pub fn new(server: impl Into<String>, account: impl Into<String>) -> Self {
        let server = server.into();
        Self {
            server: server.trim_end_matches('/').to_string(),
            account: account.into(),
        }
    }

    /// Server base URL
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Account id substituted for `~`
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Build the final URL for `raw_path`
    ///
    /// `access_token` is only read when `options.add_access_token` is set.
    pub fn build(&self, raw_path: &str, options: &UrlOptions, access_token: &str) -> String {
        let absolute = is_absolute(raw_path);
        let mut url = String::new();

        if options.add_server && !absolute {
            url.push_str(&self.server);
        }

        if !absolute && !raw_path.contains(URL_PREFIX) {
            url.push_str(URL_PREFIX);
            url.push('/');
            url.push_str(API_VERSION);
        }

        if !absolute && !raw_path.starts_with('/') {
            url.push('/');
        }
        url.push_str(&self.substitute_account(raw_path));

        if let Some(method) = options.add_method_override {
            append_query(&mut url, "_method", method.as_str());
        }

        if options.add_access_token {
            append_query(&mut url, "access_token", access_token);
        }

        url
    }

    fn substitute_account(&self, path: &str) -> String {
        if self.account == DEFAULT_ACCOUNT {
            return path.to_string();
        }
        let marker = format!("{}{}", ACCOUNT_PREFIX, DEFAULT_ACCOUNT);
        match path.find(&marker) {
            // only a whole segment: `/account/~` followed by `/`, `?` or the end
            Some(start)
                if matches!(
                    path[start + marker.len()..].chars().next(),
                    None | Some('/') | Some('?')
                ) =>
            {
                format!(
                    "{}{}{}{}",
                    &path[..start],
                    ACCOUNT_PREFIX,
                    self.account,
                    &path[start + marker.len()..]
                )
            }
            _ => path.to_string(),
        }
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

fn append_query(url: &mut String, key: &str, value: &str) {
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(key);
    url.push('=');
    url.extend(form_urlencoded::byte_serialize(value.as_bytes()));
}

// =============================================================================
// Request Descriptor
// =============================================================================

/// Typed request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/json`
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
}

impl RequestBody {
    /// Build a form body from key/value pairs
    pub fn form<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        RequestBody::Form(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Content type header value
    pub fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Json(_) => "application/json",
            RequestBody::Form(_) => "application/x-www-form-urlencoded",
        }
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            RequestBody::Json(value) => Ok(serde_json::to_vec(value)?),
            RequestBody::Form(pairs) => {
                let mut serializer = form_urlencoded::Serializer::new(String::new());
                for (key, value) in pairs {
                    serializer.append_pair(key, value);
                }
                Ok(serializer.finish().into_bytes())
            }
        }
    }
}

/// Business request descriptor
///
/// The verb is chosen by the [`Platform`](crate::Platform) method it is
/// passed to.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// API path (relative or absolute)
    pub path: String,
    /// Optional body
    pub body: Option<RequestBody>,
    /// Extra headers; names are lower-case
    pub headers: HashMap<String, String>,
    /// Send as POST with `_method=<VERB>`
    pub method_override: bool,
    /// Put the access token in the query string as well
    pub token_in_query: bool,
}

impl ApiRequest {
    /// Create a request for `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            body: None,
            headers: HashMap::new(),
            method_override: false,
            token_in_query: false,
        }
    }

    /// Set a JSON body from any serializable value
    pub fn json_body<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.body = Some(RequestBody::Json(serde_json::to_value(value)?));
        Ok(self)
    }

    /// Set a form body
    pub fn form_body<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Some(RequestBody::form(pairs));
        self
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Tunnel the verb through POST with a `_method` query parameter
    pub fn with_method_override(mut self) -> Self {
        self.method_override = true;
        self
    }

    /// Also pass the access token as a query parameter
    pub fn with_token_in_query(mut self) -> Self {
        self.token_in_query = true;
        self
    }
}
