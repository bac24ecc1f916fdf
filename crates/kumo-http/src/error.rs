//! Error taxonomy for request building and execution.

use bytes::Bytes;

/// Errors produced while configuring, encoding, sending or decoding a
/// request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The call context was cancelled before any network activity.
    #[error("call cancelled before send")]
    Cancelled,

    /// The call context was cancelled with a recorded cause.
    #[error("call cancelled before send: {0}")]
    CancelledWithCause(String),

    /// The resolved request URL could not be parsed.
    #[error("invalid request url `{url}`: {source}")]
    InvalidUrl {
        /// The URL as resolved (base URL + path).
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The JSON fallback body could not be serialized.
    #[error("failed to serialize JSON body: {0}")]
    JsonBody(#[source] serde_json::Error),

    /// A write into a [`BytesBody`](crate::BytesBody) failed.
    #[error("bytes body write failed: {0}")]
    BytesWrite(#[source] std::io::Error),

    /// A field was added to an already-closed form-data body.
    #[error("cannot add field `{key}`: form-data body already closed")]
    FormDataAdd {
        /// Field name that was rejected.
        key: String,
    },

    /// A file part was added to an already-closed form-data body.
    #[error("cannot add file `{name}`: form-data body already closed")]
    FormDataAddFile {
        /// Part name that was rejected.
        name: String,
    },

    /// A bulk field set hit an already-closed form-data body.
    #[error("bulk set failed at field `{key}`: form-data body already closed")]
    FormDataSet {
        /// First field that was rejected.
        key: String,
    },

    /// The form-data body was closed twice.
    #[error("form-data body already closed")]
    FormDataClose,

    /// The cached wire request could not be replayed, e.g. because a
    /// mutation hook swapped the buffered body for a streaming one.
    #[error("wire request body cannot be replayed")]
    BodyNotReplayable,

    /// Network, DNS or TLS failure, surfaced unwrapped from the transport.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response body could not be read to completion.
    #[error("failed to read response body: {0}")]
    ReadBody(#[source] reqwest::Error),

    /// The configured per-call deadline elapsed.
    #[error("request timed out")]
    Timeout,

    /// The response body is not valid JSON for the requested target.
    #[error("failed to parse response body from {url} (status {status}): {source}")]
    ParseBody {
        /// URL of the exchange, for diagnostics.
        url: String,
        /// Numeric status code of the exchange.
        status: u16,
        /// The raw body that failed to decode.
        body: Bytes,
        #[source]
        source: serde_json::Error,
    },

    /// Every attempt failed; wraps the last attempt's error with call
    /// metadata.
    #[error("{method} {url} failed after {attempts} attempt(s): {source}")]
    RetryExhausted {
        /// HTTP method of the call.
        method: reqwest::Method,
        /// URL as supplied by the caller.
        url: String,
        /// Whether a body was configured for the call.
        has_body: bool,
        /// Number of attempts made.
        attempts: u32,
        #[source]
        source: Box<Error>,
    },
}

/// Result alias using this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
