//! Raw-bytes request body.

use std::io;

use crate::body::content_types;
use crate::error::{Error, Result};

/// Append-only byte sink used as a request body.
///
/// The content type defaults to `application/octet-stream` and can be
/// changed at any point before the body is read during materialization.
#[derive(Debug, Clone)]
pub struct BytesBody {
    buf: Vec<u8>,
    content_type: String,
}

impl BytesBody {
    /// Create an empty body.
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            content_type: content_types::OCTET_STREAM.to_string(),
        }
    }

    /// Create a body pre-filled with `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            buf: bytes.to_vec(),
            content_type: content_types::OCTET_STREAM.to_string(),
        }
    }

    /// Append a chunk, returning the number of bytes written.
    pub fn write(&mut self, chunk: &[u8]) -> Result<usize> {
        io::Write::write(&mut self.buf, chunk).map_err(Error::BytesWrite)
    }

    /// Replace the content type in place.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        self.content_type = content_type.into();
        self
    }

    /// Replace the content type, chaining style.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// The content type this body mandates.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The accumulated bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for BytesBody {
    fn default() -> Self {
        Self::new()
    }
}

impl io::Write for BytesBody {
    fn write(&mut self, chunk: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(chunk);
        Ok(chunk.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
