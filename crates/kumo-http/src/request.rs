//! Request configuration and execution.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

use crate::auth::{self, BasicCredentials};
use crate::body::Body;
use crate::client::{self, TransportConfig};
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::response::Response;

/// Mutation hook run over the fully materialized wire request, just before
/// the first send. Hooks run last and can override anything.
pub type RequestHook = Arc<dyn Fn(&mut reqwest::Request) + Send + Sync>;

type ExportSink = Arc<dyn Fn(&Response) + Send + Sync>;

const DEFAULT_RETRY_WAIT: Duration = Duration::from_millis(100);

/// Mutable configuration for one logical HTTP call.
///
/// Configure through chained setters, then execute with one of the verb
/// methods or [`send`](Request::send). Execution consumes the request, so a
/// `Request` covers exactly one in-flight call; retries replay the wire
/// request materialized on the first attempt and never re-run the body
/// encoders.
///
/// Setters never fail: invalid input (a retry count of one or less, a zero
/// duration, an empty basic-auth username, an unparseable header name) is
/// ignored, keeping chains total.
pub struct Request {
    pub(crate) ctx: CallContext,
    pub(crate) base_url: Option<String>,
    pub(crate) client: Option<reqwest::Client>,
    pub(crate) query: BTreeMap<String, String>,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) cookies: BTreeMap<String, String>,
    pub(crate) retry_count: u32,
    pub(crate) retry_wait: Duration,
    pub(crate) timeout: Option<Duration>,
    pub(crate) basic: Option<BasicCredentials>,
    pub(crate) bearer_token: Option<String>,
    pub(crate) hooks: Vec<RequestHook>,
    pub(crate) body: Option<Body>,
    pub(crate) export: Option<ExportSink>,
}

impl Request {
    /// Create a request bound to a fresh, never-cancelled context.
    pub fn new() -> Self {
        Self::with_context(CallContext::new())
    }

    /// Create a request bound to `ctx`. The context is checked once before
    /// the first attempt; cancelling it later does not abort an in-flight
    /// call.
    pub fn with_context(ctx: CallContext) -> Self {
        Self {
            ctx,
            base_url: None,
            client: None,
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            retry_count: 1,
            retry_wait: DEFAULT_RETRY_WAIT,
            timeout: None,
            basic: None,
            bearer_token: None,
            hooks: Vec::new(),
            body: None,
            export: None,
        }
    }

    /// Prefix prepended to the path given to the verb methods.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Use `client` as the transport instead of the per-request default.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Total number of attempts. Values of one or less are ignored; the
    /// default is a single attempt.
    pub fn retry_count(mut self, count: u32) -> Self {
        if count > 1 {
            self.retry_count = count;
        }
        self
    }

    /// Sleep between attempts. Zero is ignored; the default is 100ms.
    pub fn retry_wait(mut self, wait: Duration) -> Self {
        if !wait.is_zero() {
            self.retry_wait = wait;
        }
        self
    }

    /// Overall deadline for the call, anchored when the call starts.
    /// Zero is ignored; the default is no deadline.
    ///
    /// The deadline is independent of the request's [`CallContext`]: a call
    /// running under a timeout is aborted by the deadline, not by a later
    /// cancellation of the context.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = Some(timeout);
        }
        self
    }

    /// Basic-auth credentials. Ignored when `username` is empty. Takes
    /// precedence over [`bearer_token`](Request::bearer_token).
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        let creds = BasicCredentials::new(username, password);
        if !creds.username.is_empty() {
            self.basic = Some(creds);
        }
        self
    }

    /// Bearer token for the `Authorization` header; the `Bearer ` prefix is
    /// added automatically. Loses to basic auth and to an explicitly set
    /// `Authorization` header.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Write `Bearer <token>` straight into the header map. Unlike
    /// [`bearer_token`](Request::bearer_token) this bypasses the basic/bearer
    /// precedence, so it wins over both and loses only to a later explicit
    /// `Authorization` header.
    pub fn authorization(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header("Authorization", value)
    }

    /// Sugar for setting the `Content-Type` header.
    pub fn content_type(self, content_type: impl ToString) -> Self {
        self.header("Content-Type", content_type)
    }

    /// Set a header, replacing any previous value for the key.
    pub fn header(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.headers.insert(key.into(), value.to_string());
        self
    }

    /// Bulk-set headers; existing keys are overwritten.
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

    /// Set a cookie, replacing any previous value for the key.
    pub fn cookie(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.cookies.insert(key.into(), value.to_string());
        self
    }

    /// Bulk-set cookies; existing keys are overwritten.
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

    /// Set a query parameter, replacing any previous value for the key.
    /// Merged into any query string already present in the URL.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(key.into(), value.to_string());
        self
    }

    /// Bulk-set query parameters; existing keys are overwritten.
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

    /// Append a mutation hook. Hooks run once, after the wire request is
    /// fully populated, in the order they were added.
    pub fn option<F>(self, hook: F) -> Self
    where
        F: Fn(&mut reqwest::Request) + Send + Sync + 'static,
    {
        self.hook(Arc::new(hook))
    }

    /// Append an already-shared mutation hook.
    pub fn hook(mut self, hook: RequestHook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Set the request body. See [`Body`] for the encoding dispatch.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Decode the response body into `target` after a successful exchange.
    ///
    /// Decoding failures are logged, never returned; call
    /// [`Response::parse_into`] separately for a propagated error.
    pub fn export_to<T>(mut self, target: Arc<Mutex<T>>) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.export = Some(Arc::new(move |response: &Response| {
            let mut guard = match target.lock() {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::warn!("export target mutex poisoned, skipping decode");
                    return;
                }
            };
            if let Err(error) = response.parse_into(&mut *guard) {
                tracing::warn!(%error, "failed to decode response body into export target");
            }
        }));
        self
    }

    /// Execute with method `GET`.
    pub async fn get(self, url: &str) -> Result<Response> {
        self.send(Method::GET, url).await
    }

    /// Execute with method `POST`.
    pub async fn post(self, url: &str) -> Result<Response> {
        self.send(Method::POST, url).await
    }

    /// Execute with method `PUT`.
    pub async fn put(self, url: &str) -> Result<Response> {
        self.send(Method::PUT, url).await
    }

    /// Execute with method `PATCH`.
    pub async fn patch(self, url: &str) -> Result<Response> {
        self.send(Method::PATCH, url).await
    }

    /// Execute with method `DELETE`.
    pub async fn delete(self, url: &str) -> Result<Response> {
        self.send(Method::DELETE, url).await
    }

    /// Execute with method `OPTIONS`.
    pub async fn options(self, url: &str) -> Result<Response> {
        self.send(Method::OPTIONS, url).await
    }

    /// Execute with method `HEAD`.
    pub async fn head(self, url: &str) -> Result<Response> {
        self.send(Method::HEAD, url).await
    }

    /// Execute the call: pre-flight cancellation check, optional overall
    /// deadline, then up to `retry_count` sequential attempts.
    pub async fn send(mut self, method: Method, url: &str) -> Result<Response> {
        // checked once, before any network activity; never between retries
        if self.ctx.is_cancelled() {
            return Err(match self.ctx.cause() {
                Some(cause) => Error::CancelledWithCause(cause),
                None => Error::Cancelled,
            });
        }

        match self.timeout.take() {
            // the deadline is anchored fresh here and does not observe the
            // caller's context
            Some(limit) => match tokio::time::timeout(limit, self.run(method, url)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::Timeout),
            },
            None => self.run(method, url).await,
        }
    }

    async fn run(&mut self, method: Method, url: &str) -> Result<Response> {
        let has_body = self.body.is_some();
        let transport = match &self.client {
            Some(client) => client.clone(),
            None => client::build_transport(&TransportConfig::default())?,
        };

        let mut wire: Option<reqwest::Request> = None;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.attempt(&transport, &mut wire, method.clone(), url).await {
                Ok(response) => return Ok(response),
                Err(error) if attempt < self.retry_count => {
                    tracing::debug!(attempt, %error, "request attempt failed, retrying");
                    tokio::time::sleep(self.retry_wait).await;
                }
                Err(error) => {
                    return Err(Error::RetryExhausted {
                        method,
                        url: url.to_string(),
                        has_body,
                        attempts: attempt,
                        source: Box::new(error),
                    });
                }
            }
        }
    }

    async fn attempt(
        &mut self,
        transport: &reqwest::Client,
        wire: &mut Option<reqwest::Request>,
        method: Method,
        url: &str,
    ) -> Result<Response> {
        // materialized once, on the first attempt; retries replay the cache
        if wire.is_none() {
            *wire = Some(self.materialize(method, url)?);
        }
        let request = match wire.as_ref().and_then(reqwest::Request::try_clone) {
            Some(request) => request,
            None => return Err(Error::BodyNotReplayable),
        };

        tracing::debug!(url = %request.url(), method = %request.method(), "sending request");
        let raw = transport.execute(request).await.map_err(Error::Transport)?;
        tracing::debug!(status = raw.status().as_u16(), %url, "received response");

        let response = Response::capture(raw).await?;
        if let Some(export) = &self.export {
            export(&response);
        }
        Ok(response)
    }

    /// Resolve URL, body, query, auth, headers, cookies and hooks into the
    /// wire request. Runs exactly once per call.
    pub(crate) fn materialize(&mut self, method: Method, path: &str) -> Result<reqwest::Request> {
        let full_url = match &self.base_url {
            Some(base) => format!("{base}{path}"),
            None => path.to_string(),
        };
        let mut url = Url::parse(&full_url).map_err(|source| Error::InvalidUrl {
            url: full_url.clone(),
            source,
        })?;

        // body resolution; encoder content types overwrite any configured
        // Content-Type entry, the JSON fallback sets none
        let mut payload = None;
        if let Some(body) = self.body.as_mut() {
            let (bytes, content_type) = body.into_parts()?;
            if let Some(content_type) = content_type {
                self.headers
                    .insert("Content-Type".to_string(), content_type);
            }
            payload = Some(bytes);
        }

        // merge configured query entries; they overwrite by key
        if !self.query.is_empty() {
            let mut merged: BTreeMap<String, String> = url
                .query_pairs()
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            merged.extend(
                self.query
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone())),
            );

            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (key, value) in &merged {
                pairs.append_pair(key, value);
            }
            drop(pairs);
        }

        let mut request = reqwest::Request::new(method, url);
        if let Some(bytes) = payload {
            *request.body_mut() = Some(reqwest::Body::from(bytes));
        }

        {
            let headers = request.headers_mut();

            // auth first; an explicit Authorization entry below overrides it
            if let Some(value) =
                auth::resolve_authorization(self.basic.as_ref(), self.bearer_token.as_deref())
            {
                if let Ok(value) = HeaderValue::try_from(value) {
                    headers.insert(AUTHORIZATION, value);
                }
            }

            for (key, value) in &self.headers {
                if let (Ok(name), Ok(value)) = (
                    HeaderName::try_from(key.as_str()),
                    HeaderValue::try_from(value.as_str()),
                ) {
                    headers.insert(name, value);
                }
            }

            if !self.cookies.is_empty() {
                let cookie = self
                    .cookies
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect::<Vec<_>>()
                    .join("; ");
                if let Ok(value) = HeaderValue::try_from(cookie) {
                    headers.insert(COOKIE, value);
                }
            }
        }

        for hook in &self.hooks {
            hook(&mut request);
        }

        Ok(request)
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
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
    use crate::body::{BytesBody, FormUrlEncoded};

    fn header<'a>(request: &'a reqwest::Request, name: &str) -> Option<&'a str> {
        request.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn setters_clamp_invalid_input() {
        let request = Request::new()
            .retry_count(0)
            .retry_count(1)
            .retry_wait(Duration::ZERO)
            .timeout(Duration::ZERO)
            .basic_auth("", "secret");

        assert_eq!(request.retry_count, 1);
        assert_eq!(request.retry_wait, Duration::from_millis(100));
        assert!(request.timeout.is_none());
        assert!(request.basic.is_none());
    }

    #[test]
    fn base_url_is_prefixed() {
        let mut request = Request::new().base_url("http://example.com/api");
        let wire = request.materialize(Method::GET, "/users").unwrap();
        assert_eq!(wire.url().as_str(), "http://example.com/api/users");
    }

    #[test]
    fn invalid_url_is_reported() {
        let mut request = Request::new();
        let err = request.materialize(Method::GET, "not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn query_entries_merge_and_overwrite() {
        let mut request = Request::new().query("b", 9).query("c", 3);
        let wire = request
            .materialize(Method::GET, "http://example.com/p?a=1&b=2")
            .unwrap();

        let pairs: Vec<(String, String)> = wire
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "9".to_string()),
                ("c".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn basic_auth_wins_over_bearer() {
        let mut request = Request::new()
            .bearer_token("token123")
            .basic_auth("user", "pass");
        let wire = request.materialize(Method::GET, "http://example.com/").unwrap();
        assert_eq!(header(&wire, "authorization"), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn empty_basic_username_leaves_bearer() {
        let mut request = Request::new()
            .basic_auth("", "pass")
            .bearer_token("token123");
        let wire = request.materialize(Method::GET, "http://example.com/").unwrap();
        assert_eq!(header(&wire, "authorization"), Some("Bearer token123"));
    }

    #[test]
    fn authorization_sugar_overrides_bearer_token() {
        let mut request = Request::new()
            .bearer_token("older")
            .authorization("newer");
        let wire = request.materialize(Method::GET, "http://example.com/").unwrap();
        assert_eq!(header(&wire, "authorization"), Some("Bearer newer"));
    }

    #[test]
    fn explicit_header_wins_over_all_auth() {
        let mut request = Request::new()
            .basic_auth("user", "pass")
            .authorization("sugar")
            .header("Authorization", "Custom scheme");
        let wire = request.materialize(Method::GET, "http://example.com/").unwrap();
        assert_eq!(header(&wire, "authorization"), Some("Custom scheme"));
    }

    #[test]
    fn no_auth_configured_means_no_header() {
        let mut request = Request::new();
        let wire = request.materialize(Method::GET, "http://example.com/").unwrap();
        assert_eq!(header(&wire, "authorization"), None);
    }

    #[test]
    fn encoder_content_type_overrides_configured_header() {
        let mut request = Request::new()
            .content_type("text/plain")
            .body(BytesBody::from_slice(b"x").with_content_type("application/cbor"));
        let wire = request.materialize(Method::POST, "http://example.com/").unwrap();
        assert_eq!(header(&wire, "content-type"), Some("application/cbor"));
        assert_eq!(wire.body().and_then(|b| b.as_bytes()), Some(&b"x"[..]));
    }

    #[test]
    fn json_fallback_keeps_configured_content_type() {
        let mut request = Request::new()
            .content_type("application/json")
            .body(serde_json::json!({"a": 1}));
        let wire = request.materialize(Method::POST, "http://example.com/").unwrap();
        assert_eq!(header(&wire, "content-type"), Some("application/json"));
        assert_eq!(
            wire.body().and_then(|b| b.as_bytes()),
            Some(&br#"{"a":1}"#[..])
        );
    }

    #[test]
    fn json_fallback_sets_no_content_type_by_itself() {
        let mut request = Request::new().body(serde_json::json!({"a": 1}));
        let wire = request.materialize(Method::POST, "http://example.com/").unwrap();
        assert_eq!(header(&wire, "content-type"), None);
    }

    #[test]
    fn urlencoded_body_sets_form_content_type() {
        let mut form = FormUrlEncoded::new();
        form.set("k", "v");
        let mut request = Request::new().body(form);
        let wire = request.materialize(Method::POST, "http://example.com/").unwrap();
        assert_eq!(
            header(&wire, "content-type"),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn cookies_collapse_into_one_header() {
        let mut request = Request::new().cookie("a", 1).cookie("b", "two");
        let wire = request.materialize(Method::GET, "http://example.com/").unwrap();
        assert_eq!(header(&wire, "cookie"), Some("a=1; b=two"));
    }

    #[test]
    fn invalid_header_names_are_skipped() {
        let mut request = Request::new()
            .header("bad name", "x")
            .header("X-Good", "y");
        let wire = request.materialize(Method::GET, "http://example.com/").unwrap();
        assert_eq!(header(&wire, "X-Good"), Some("y"));
        assert_eq!(wire.headers().len(), 1);
    }

    #[test]
    fn hooks_run_last_and_override() {
        let mut request = Request::new()
            .header("X-Stage", "configured")
            .option(|wire: &mut reqwest::Request| {
                wire.headers_mut()
                    .insert("X-Stage", HeaderValue::from_static("hooked"));
            });
        let wire = request.materialize(Method::GET, "http://example.com/").unwrap();
        assert_eq!(header(&wire, "X-Stage"), Some("hooked"));
    }

    #[test]
    fn materialized_request_is_replayable() {
        let mut request = Request::new().body(BytesBody::from_slice(b"payload"));
        let wire = request.materialize(Method::POST, "http://example.com/").unwrap();

        let replay = wire.try_clone().expect("buffered body must be replayable");
        assert_eq!(
            replay.body().and_then(|b| b.as_bytes()),
            Some(&b"payload"[..])
        );
    }
}
