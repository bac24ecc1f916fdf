//! Captured HTTP responses.

use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Read-only capture of a finished exchange.
///
/// The body is drained to completion and buffered before the response is
/// handed to the caller; [`parse_into`](Response::parse_into) decodes the
/// same buffered bytes on every call.
#[derive(Debug, Clone)]
pub struct Response {
    url: String,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Drain `raw` into a buffered capture.
    pub(crate) async fn capture(raw: reqwest::Response) -> Result<Self> {
        let url = raw.url().to_string();
        let status = raw.status();
        let headers = raw.headers().clone();
        let body = raw.bytes().await.map_err(Error::ReadBody)?;

        Ok(Self {
            url,
            status,
            headers,
            body,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(url: &str, status: StatusCode, body: &[u8]) -> Self {
        Self {
            url: url.to_string(),
            status,
            headers: HeaderMap::new(),
            body: Bytes::copy_from_slice(body),
        }
    }

    /// The status line, e.g. `200 OK`.
    pub fn status(&self) -> String {
        match self.status.canonical_reason() {
            Some(reason) => format!("{} {}", self.status.as_u16(), reason),
            None => self.status.as_u16().to_string(),
        }
    }

    /// The numeric status code.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The `Content-Type` header value, or an empty string when absent.
    pub fn content_type(&self) -> &str {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
    }

    /// The URL of the exchange.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The full buffered body.
    pub fn body_raw(&self) -> &[u8] {
        &self.body
    }

    /// True iff the status code is a client or server failure (4xx/5xx).
    pub fn is_failure(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }

    /// Decode the buffered body as JSON into `target`.
    ///
    /// An empty body is a no-op and leaves `target` untouched. Malformed
    /// JSON fails with [`Error::ParseBody`] carrying the URL, status and raw
    /// bytes. Repeated calls re-decode the same buffered bytes.
    pub fn parse_into<T: DeserializeOwned>(&self, target: &mut T) -> Result<()> {
        if self.body.is_empty() {
            return Ok(());
        }

        *target = serde_json::from_slice(&self.body).map_err(|source| Error::ParseBody {
            url: self.url.clone(),
            status: self.status.as_u16(),
            body: self.body.clone(),
            source,
        })?;

        Ok(())
    }
}
