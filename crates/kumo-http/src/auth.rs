//! Authorization header resolution.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Username/password pair for HTTP basic auth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

impl BasicCredentials {
    /// Create a credentials pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn header_value(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

/// Resolve the `Authorization` value for a call.
///
/// Basic credentials win over a bearer token; an empty username never
/// produces a header. A directly configured `Authorization` header entry is
/// applied after this resolver during materialization and overrides both.
pub(crate) fn resolve_authorization(
    basic: Option<&BasicCredentials>,
    bearer: Option<&str>,
) -> Option<String> {
    if let Some(basic) = basic {
        if !basic.username.is_empty() {
            return Some(basic.header_value());
        }
    }

    match bearer {
        Some(token) if !token.is_empty() => Some(format!("Bearer {token}")),
        _ => None,
    }
}
