//! Client template and transport configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::auth::BasicCredentials;
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::request::{Request, RequestHook};

/// Configuration for the fallback transport built per request when no
/// shared [`reqwest::Client`] is injected.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Skip TLS certificate verification. Off by default; see
    /// [`TransportConfig::insecure`].
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("kumo/{}", env!("CARGO_PKG_VERSION")),
            accept_invalid_certs: false,
        }
    }
}

impl TransportConfig {
    /// A transport that accepts invalid TLS certificates.
    ///
    /// This reproduces the verification-disabled fallback some legacy
    /// deployments rely on. Only use it against endpoints you control.
    pub fn insecure() -> Self {
        Self {
            accept_invalid_certs: true,
            ..Self::default()
        }
    }
}

/// Build a transport client from `config`.
pub fn build_transport(config: &TransportConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent);

    if config.accept_invalid_certs {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().map_err(Error::Transport)
}

/// Reusable template that pre-seeds requests with shared defaults.
///
/// Every setting a [`Request`] accepts can be stored here once and is
/// inherited by each request created through [`Client::request`]; any of it
/// can still be overridden per call. Setter clamp rules match the request's.
#[derive(Clone, Default)]
pub struct Client {
    base_url: Option<String>,
    http: Option<reqwest::Client>,
    headers: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
    retry_count: u32,
    retry_wait: Option<Duration>,
    timeout: Option<Duration>,
    basic: Option<BasicCredentials>,
    bearer_token: Option<String>,
    hooks: Vec<RequestHook>,
}

impl Client {
    /// Create an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Base URL prepended to every nested request's path.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Shared transport for every nested request.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Default attempt count; one or less is ignored.
    pub fn retry_count(mut self, count: u32) -> Self {
        if count > 1 {
            self.retry_count = count;
        }
        self
    }

    /// Default sleep between attempts; zero is ignored.
    pub fn retry_wait(mut self, wait: Duration) -> Self {
        if !wait.is_zero() {
            self.retry_wait = Some(wait);
        }
        self
    }

    /// Default overall deadline; zero is ignored.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = Some(timeout);
        }
        self
    }

    /// Default basic-auth credentials; an empty username is ignored.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        let creds = BasicCredentials::new(username, password);
        if !creds.username.is_empty() {
            self.basic = Some(creds);
        }
        self
    }

    /// Default bearer token.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Write `Bearer <token>` straight into the default header map.
    pub fn authorization(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header("Authorization", value)
    }

    /// Sugar for the default `Content-Type` header.
    pub fn content_type(self, content_type: impl ToString) -> Self {
        self.header("Content-Type", content_type)
    }

    /// Set a default header, replacing any previous value for the key.
    pub fn header(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.headers.insert(key.into(), value.to_string());
        self
    }

    /// Bulk-set default headers; existing keys are overwritten.
    pub fn headers<K, V, I>(mut self, entries: I) -> Self
    where
        K: Into<String>,
        V: ToString,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.headers.insert(key.into(), value.to_string());
        }
        self
    }

    /// Set a default cookie, replacing any previous value for the key.
    pub fn cookie(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.cookies.insert(key.into(), value.to_string());
        self
    }

    /// Bulk-set default cookies; existing keys are overwritten.
    pub fn cookies<K, V, I>(mut self, entries: I) -> Self
    where
        K: Into<String>,
        V: ToString,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.cookies.insert(key.into(), value.to_string());
        }
        self
    }

    /// Set a default query parameter, replacing any previous value.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(key.into(), value.to_string());
        self
    }

    /// Bulk-set default query parameters; existing keys are overwritten.
    pub fn queries<K, V, I>(mut self, entries: I) -> Self
    where
        K: Into<String>,
        V: ToString,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.query.insert(key.into(), value.to_string());
        }
        self
    }

    /// Append a default mutation hook.
    pub fn option<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut reqwest::Request) + Send + Sync + 'static,
    {
        self.hooks.push(std::sync::Arc::new(hook));
        self
    }

    /// Create a fresh [`Request`] bound to `ctx`, pre-seeded with every
    /// default stored in this template.
    pub fn request(&self, ctx: CallContext) -> Request {
        let mut request = Request::with_context(ctx)
            .headers(self.headers.clone())
            .cookies(self.cookies.clone())
            .queries(self.query.clone());

        if let Some(base_url) = &self.base_url {
            request = request.base_url(base_url.clone());
        }
        if let Some(http) = &self.http {
            request = request.client(http.clone());
        }
        if self.retry_count > 1 {
            request = request.retry_count(self.retry_count);
        }
        if let Some(wait) = self.retry_wait {
            request = request.retry_wait(wait);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        if let Some(basic) = &self.basic {
            request = request.basic_auth(basic.username.clone(), basic.password.clone());
        }
        if let Some(token) = &self.bearer_token {
            request = request.bearer_token(token.clone());
        }
        for hook in &self.hooks {
            request = request.hook(hook.clone());
        }

        request
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("retry_count", &self.retry_count)
            .field("retry_wait", &self.retry_wait)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers.len())
            .field("query", &self.query.len())
            .field("cookies", &self.cookies.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    #[test]
    fn default_transport_config() {
        let config = TransportConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("kumo/"));
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn insecure_preset_flips_cert_verification_only() {
        let config = TransportConfig::insecure();
        assert!(config.accept_invalid_certs);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn build_transport_succeeds() {
        assert!(build_transport(&TransportConfig::default()).is_ok());
        assert!(build_transport(&TransportConfig::insecure()).is_ok());
    }

    #[test]
    fn template_seeds_requests() {
        let client = Client::new()
            .base_url("http://example.com/api")
            .header("X-Team", "platform")
            .cookie("session", "abc")
            .query("tenant", "t1")
            .retry_count(4)
            .retry_wait(Duration::from_millis(250))
            .timeout(Duration::from_secs(5))
            .bearer_token("token123");

        let mut request = client.request(CallContext::new());
        assert_eq!(request.retry_count, 4);
        assert_eq!(request.retry_wait, Duration::from_millis(250));
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));

        let wire = request.materialize(Method::GET, "/items").unwrap();
        assert_eq!(
            wire.url().as_str(),
            "http://example.com/api/items?tenant=t1"
        );
        assert_eq!(wire.headers().get("X-Team").unwrap(), "platform");
        assert_eq!(wire.headers().get("cookie").unwrap(), "session=abc");
        assert_eq!(
            wire.headers().get("authorization").unwrap(),
            "Bearer token123"
        );
    }

    #[test]
    fn per_call_settings_override_template() {
        let client = Client::new()
            .header("X-Team", "platform")
            .retry_count(4)
            .bearer_token("shared");

        let mut request = client
            .request(CallContext::new())
            .header("X-Team", "override")
            .retry_count(2)
            .bearer_token("mine");

        assert_eq!(request.retry_count, 2);
        let wire = request.materialize(Method::GET, "http://example.com/").unwrap();
        assert_eq!(wire.headers().get("X-Team").unwrap(), "override");
        assert_eq!(wire.headers().get("authorization").unwrap(), "Bearer mine");
    }

    #[test]
    fn clamp_rules_match_request() {
        let client = Client::new()
            .retry_count(1)
            .retry_wait(Duration::ZERO)
            .timeout(Duration::ZERO)
            .basic_auth("", "pass");

        let request = client.request(CallContext::new());
        assert_eq!(request.retry_count, 1);
        assert!(request.timeout.is_none());
        assert!(request.basic.is_none());
    }
}
