//! Multipart form-data request body.

use rand::Rng;

use crate::error::{Error, Result};

/// `multipart/form-data` body writer.
///
/// Fields and file parts are framed into an internal buffer as they are
/// added. [`close`](FormData::close) writes the multipart trailer and must
/// happen exactly once, before the buffer is read. Request materialization
/// performs the close itself, so do not close a body handed to a request.
/// Any mutation after close is rejected.
#[derive(Debug, Clone)]
pub struct FormData {
    boundary: String,
    buf: Vec<u8>,
    closed: bool,
}

impl FormData {
    /// Create an empty form with a fresh random boundary.
    pub fn new() -> Self {
        Self {
            boundary: random_boundary(),
            buf: Vec::new(),
            closed: false,
        }
    }

    /// Create a form pre-filled with `fields`.
    pub fn with_fields<K, V, I>(fields: I) -> Result<Self>
    where
        K: ToString,
        V: ToString,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut form = Self::new();
        form.set(fields)?;
        Ok(form)
    }

    /// Append a named field with a stringified value.
    pub fn add(&mut self, key: &str, value: impl ToString) -> Result<()> {
        if self.closed {
            return Err(Error::FormDataAdd {
                key: key.to_string(),
            });
        }

        self.begin_part(&format!(
            "Content-Disposition: form-data; name=\"{}\"\r\n",
            escape_quotes(key)
        ));
        self.buf.extend_from_slice(value.to_string().as_bytes());
        self.buf.extend_from_slice(b"\r\n");
        Ok(())
    }

    /// Append a file part with the given part name, file name and content.
    pub fn add_file(&mut self, name: &str, file_name: &str, contents: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::FormDataAddFile {
                name: name.to_string(),
            });
        }

        self.begin_part(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
             Content-Type: application/octet-stream\r\n",
            escape_quotes(name),
            escape_quotes(file_name)
        ));
        self.buf.extend_from_slice(contents);
        self.buf.extend_from_slice(b"\r\n");
        Ok(())
    }

    /// Bulk-append fields, stopping at the first failure.
    pub fn set<K, V, I>(&mut self, fields: I) -> Result<()>
    where
        K: ToString,
        V: ToString,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in fields {
            let key = key.to_string();
            if let Err(Error::FormDataAdd { key }) = self.add(&key, value) {
                return Err(Error::FormDataSet { key });
            }
        }
        Ok(())
    }

    /// The multipart boundary token.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The full `multipart/form-data; boundary=...` header value.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// The framed bytes accumulated so far.
    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    /// Whether the trailer has been written.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Write the multipart trailer. Must happen exactly once.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::FormDataClose);
        }
        self.buf
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.closed = true;
        Ok(())
    }

    fn begin_part(&mut self, headers: &str) {
        self.buf
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.buf.extend_from_slice(headers.as_bytes());
        self.buf.extend_from_slice(b"\r\n");
    }
}

impl Default for FormData {
    fn default() -> Self {
        Self::new()
    }
}

// 30 hex characters, long enough to never collide with part content.
fn random_boundary() -> String {
    let mut rng = rand::thread_rng();
    let mut boundary = String::with_capacity(30);
    for _ in 0..15 {
        boundary.push_str(&format!("{:02x}", rng.gen::<u8>()));
    }
    boundary
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
