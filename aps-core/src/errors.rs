//! # Errors
//!
//! Every failure crossing the vendor boundary is surfaced as an [`ApsError`].
//! Upstream variants carry the HTTP status and the most useful message the
//! vendor sent back, so callers can decide on their own retry policy.
//!
//! Two situations are deliberately *not* errors and never show up here:
//! - a `409 Conflict` when creating a bucket that already exists
//! - an unrecognized translation status or unparseable progress value

use thiserror::Error;

/// Result type for all aps operations
pub type ApsResult<T> = Result<T, ApsError>;

/// Which part of the vendor API produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    /// Token endpoint (client credentials, authorization code, refresh token)
    Auth,
    /// Bucket and object endpoints
    Storage,
    /// Translation job and manifest endpoints
    Translation,
    /// Metadata, object tree and property endpoints
    Metadata,
}

impl Upstream {
    pub fn name(&self) -> &'static str {
        match self {
            Upstream::Auth => "auth",
            Upstream::Storage => "storage",
            Upstream::Translation => "translation",
            Upstream::Metadata => "metadata",
        }
    }
}

/// Errors that can occur while talking to the platform
#[derive(Error, Debug)]
pub enum ApsError {
    #[error("Credential request failed with status {status}: {message}")]
    UpstreamAuth { status: u16, message: String },

    #[error("Storage request failed with status {status}: {message}")]
    UpstreamStorage { status: u16, message: String },

    #[error("Translation request failed with status {status}: {message}")]
    UpstreamTranslation { status: u16, message: String },

    #[error("Metadata request failed with status {status}: {message}")]
    UpstreamMetadata { status: u16, message: String },

    #[error("Transport error: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to decode vendor response: {source}")]
    Decode {
        #[from]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl ApsError {
    /// Build the upstream variant matching `kind`
    pub fn upstream(kind: Upstream, status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            Upstream::Auth => Self::UpstreamAuth { status, message },
            Upstream::Storage => Self::UpstreamStorage { status, message },
            Upstream::Translation => Self::UpstreamTranslation { status, message },
            Upstream::Metadata => Self::UpstreamMetadata { status, message },
        }
    }

    pub fn upstream_auth(status: u16, message: impl Into<String>) -> Self {
        Self::upstream(Upstream::Auth, status, message)
    }

    pub fn upstream_storage(status: u16, message: impl Into<String>) -> Self {
        Self::upstream(Upstream::Storage, status, message)
    }

    pub fn upstream_translation(status: u16, message: impl Into<String>) -> Self {
        Self::upstream(Upstream::Translation, status, message)
    }

    pub fn upstream_metadata(status: u16, message: impl Into<String>) -> Self {
        Self::upstream(Upstream::Metadata, status, message)
    }

    /// Wrap a connection-level failure (DNS, TLS, timeout, ...)
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            source: Box::new(error),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// HTTP status reported by the vendor, if this is an upstream failure
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamAuth { status, .. }
            | Self::UpstreamStorage { status, .. }
            | Self::UpstreamTranslation { status, .. }
            | Self::UpstreamMetadata { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Which vendor API failed, if any
    pub fn upstream_kind(&self) -> Option<Upstream> {
        match self {
            Self::UpstreamAuth { .. } => Some(Upstream::Auth),
            Self::UpstreamStorage { .. } => Some(Upstream::Storage),
            Self::UpstreamTranslation { .. } => Some(Upstream::Translation),
            Self::UpstreamMetadata { .. } => Some(Upstream::Metadata),
            _ => None,
        }
    }

    pub fn is_upstream(&self) -> bool {
        self.upstream_kind().is_some()
    }
}

const MAX_MESSAGE_LEN: usize = 512;

/// Pull a human readable message out of a vendor error body.
///
/// The platform is not consistent about where it puts the reason, so the
/// known fields are tried in order before falling back to the raw body.
pub fn vendor_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["developerMessage", "reason", "errorMessage", "error_description", "diagnostic"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                if !msg.trim().is_empty() {
                    return msg.to_string();
                }
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "empty response body".to_string();
    }

    match text.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
