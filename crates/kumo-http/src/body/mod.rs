//! Request body encoders.
//!
//! Exactly one body kind applies per call. The [`Body`] enum is the single
//! dispatch point: each variant knows how to turn itself into buffered bytes
//! plus the `Content-Type` it mandates (the JSON fallback mandates none).

mod bytes;
mod form_data;
mod form_urlencoded;

pub use self::bytes::BytesBody;
pub use self::form_data::FormData;
pub use self::form_urlencoded::FormUrlEncoded;

use ::bytes::Bytes;
use serde::Serialize;

use crate::error::{Error, Result};

/// Content types emitted by the body encoders.
pub mod content_types {
    /// Default content type of [`BytesBody`](super::BytesBody).
    pub const OCTET_STREAM: &str = "application/octet-stream";
    /// Content type of [`FormUrlEncoded`](super::FormUrlEncoded).
    pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
    /// JSON content type; never forced by the fallback encoder.
    pub const JSON: &str = "application/json";
}

/// A request body, selected once at the call boundary.
///
/// Dispatch priority is fixed: form-data, then raw bytes, then url-encoded
/// form, then the JSON fallback for any serializable value.
#[derive(Debug)]
pub enum Body {
    /// `multipart/form-data` fields and files.
    FormData(FormData),
    /// Raw bytes with a caller-controlled content type.
    Bytes(BytesBody),
    /// `application/x-www-form-urlencoded` key/value pairs.
    FormUrlEncoded(FormUrlEncoded),
    /// Any serializable value, sent as JSON.
    Json(serde_json::Value),
}

impl Body {
    /// Serialize `value` as the JSON fallback body.
    ///
    /// No `Content-Type` header is forced for this variant; set one through
    /// the request if the server requires it.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Body::Json)
            .map_err(Error::JsonBody)
    }

    /// Resolve the body into buffered bytes plus the content type it
    /// mandates. Form-data bodies are finalized here; a body the caller
    /// already closed aborts resolution. Takes `&mut self` so a failed
    /// resolution fails identically on every retry.
    pub(crate) fn into_parts(&mut self) -> Result<(Bytes, Option<String>)> {
        match self {
            Body::FormData(form) => {
                form.close()?;
                let content_type = form.content_type();
                Ok((Bytes::copy_from_slice(form.buffer()), Some(content_type)))
            }
            Body::Bytes(bytes) => Ok((
                Bytes::copy_from_slice(bytes.bytes()),
                Some(bytes.content_type().to_string()),
            )),
            Body::FormUrlEncoded(form) => Ok((
                Bytes::from(form.encode().into_bytes()),
                Some(content_types::FORM_URLENCODED.to_string()),
            )),
            Body::Json(value) => {
                let blob = serde_json::to_vec(value).map_err(Error::JsonBody)?;
                Ok((Bytes::from(blob), None))
            }
        }
    }
}

impl From<FormData> for Body {
    fn from(form: FormData) -> Self {
        Body::FormData(form)
    }
}

impl From<BytesBody> for Body {
    fn from(bytes: BytesBody) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<FormUrlEncoded> for Body {
    fn from(form: FormUrlEncoded) -> Self {
        Body::FormUrlEncoded(form)
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Body::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fallback_forces_no_content_type() {
        let mut body = Body::json(&serde_json::json!({"a": 1})).unwrap();
        let (bytes, content_type) = body.into_parts().unwrap();
        assert_eq!(&bytes[..], br#"{"a":1}"#);
        assert!(content_type.is_none());
    }

    #[test]
    fn bytes_body_reports_its_content_type() {
        let mut raw = BytesBody::new();
        raw.write(b"abc").unwrap();
        let mut body = Body::from(raw);
        let (bytes, content_type) = body.into_parts().unwrap();
        assert_eq!(&bytes[..], b"abc");
        assert_eq!(content_type.as_deref(), Some(content_types::OCTET_STREAM));
    }

    #[test]
    fn urlencoded_body_reports_form_content_type() {
        let mut form = FormUrlEncoded::new();
        form.set("k", "v");
        let mut body = Body::from(form);
        let (bytes, content_type) = body.into_parts().unwrap();
        assert_eq!(&bytes[..], b"k=v");
        assert_eq!(content_type.as_deref(), Some(content_types::FORM_URLENCODED));
    }

    #[test]
    fn form_data_is_finalized_during_resolution() {
        let mut form = FormData::new();
        form.add("name", "kumo").unwrap();
        let boundary = form.boundary().to_string();

        let mut body = Body::from(form);
        let (bytes, content_type) = body.into_parts().unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
        assert!(content_type.unwrap().contains(&boundary));
    }

    #[test]
    fn pre_closed_form_data_fails_resolution_every_time() {
        let mut form = FormData::new();
        form.add("k", "v").unwrap();
        form.close().unwrap();

        let mut body = Body::from(form);
        assert!(matches!(body.into_parts(), Err(Error::FormDataClose)));
        // a retry resolves the same poisoned body and fails the same way
        assert!(matches!(body.into_parts(), Err(Error::FormDataClose)));
    }
}
