//! URL-encoded form request body.

use std::collections::BTreeMap;

/// `application/x-www-form-urlencoded` body.
///
/// Keys are unique with last-write-wins semantics. [`encode`] re-serializes
/// the current state on every call; output is sorted by key, so it is
/// deterministic.
///
/// [`encode`]: FormUrlEncoded::encode
#[derive(Debug, Clone, Default)]
pub struct FormUrlEncoded {
    values: BTreeMap<String, String>,
}

impl FormUrlEncoded {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// The value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Remove `key`.
    pub fn delete(&mut self, key: &str) {
        self.values.remove(key);
    }

    /// Whether `key` is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Serialize the current pairs as a URL-encoded query string.
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.values {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}
