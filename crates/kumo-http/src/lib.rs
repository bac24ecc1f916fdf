//! Fluent HTTP request building and execution on top of [`reqwest`].
//!
//! A [`Request`] collects configuration through chained setters, then
//! executes with retry and timeout control. The wire request is materialized
//! once, on the first attempt, and replayed across retries; the captured
//! [`Response`] buffers the whole body and decodes it on demand. Request
//! bodies go through one of four encoders: multipart [`FormData`], raw
//! [`BytesBody`], [`FormUrlEncoded`], or the JSON fallback for any
//! serializable value.
//!
//! ```no_run
//! use kumo_http::Request;
//!
//! # async fn run() -> kumo_http::Result<()> {
//! #[derive(serde::Deserialize, Default)]
//! struct User {
//!     name: String,
//! }
//!
//! let response = Request::new()
//!     .base_url("https://api.example.com")
//!     .bearer_token("secret")
//!     .retry_count(3)
//!     .get("/users/1")
//!     .await?;
//!
//! let mut user = User::default();
//! response.parse_into(&mut user)?;
//! # Ok(())
//! # }
//! ```
//!
//! Shared defaults live on a [`Client`] template; [`Client::request`]
//! returns a fresh pre-seeded `Request` with every setting still
//! overridable per call.

pub mod auth;
pub mod body;
pub mod client;
pub mod context;
pub mod error;
pub mod request;
pub mod response;

pub use auth::BasicCredentials;
pub use body::{Body, BytesBody, FormData, FormUrlEncoded};
pub use client::{build_transport, Client, TransportConfig};
pub use context::CallContext;
pub use error::{Error, Result};
pub use request::{Request, RequestHook};
pub use response::Response;

pub use reqwest::Method;

/// One-shot GET bound to `ctx`, with default settings.
pub async fn get(ctx: CallContext, url: &str) -> Result<Response> {
    Request::with_context(ctx).get(url).await
}

/// One-shot POST of `body` bound to `ctx`, with default settings.
pub async fn post(ctx: CallContext, url: &str, body: impl Into<Body>) -> Result<Response> {
    Request::with_context(ctx).body(body).post(url).await
}

/// One-shot PUT of `body` bound to `ctx`, with default settings.
pub async fn put(ctx: CallContext, url: &str, body: impl Into<Body>) -> Result<Response> {
    Request::with_context(ctx).body(body).put(url).await
}

/// One-shot DELETE bound to `ctx`, with default settings.
pub async fn delete(ctx: CallContext, url: &str) -> Result<Response> {
    Request::with_context(ctx).delete(url).await
}
