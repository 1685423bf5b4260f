use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Transport-safe handle for a resource URN.
///
/// The platform wants URNs in URL paths and job bodies as URL-safe base64
/// without `=` padding. The encoding is deterministic and never decoded back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpaqueId(String);

impl OpaqueId {
    /// Encode a raw URN
    pub fn encode(raw: &str) -> Self {
        Self(encode_urn(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for OpaqueId {
    fn from(raw: &str) -> Self {
        Self::encode(raw)
    }
}

impl AsRef<str> for OpaqueId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OpaqueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// URL-safe base64 of the UTF-8 bytes of `raw`, padding stripped
pub fn encode_urn(raw: &str) -> String {
    URL_SAFE_NO_PAD.encode(raw.as_bytes())
}
