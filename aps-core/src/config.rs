//! # Configuration
//!
//! The client needs three things from the application: a client id, a client
//! secret and the callback URL registered for the delegated (3-legged) flow.
//! Everything else has a sensible default and can be overridden with the
//! `with_*` builders.
//!
//! ```rust
//! use aps_core::ApsConfig;
//! use std::time::Duration;
//!
//! let config = ApsConfig::new("my-client", "my-secret", "https://app.example.com/oauth/callback")
//!     .with_upload_timeout(Duration::from_secs(600));
//!
//! assert!(config.validate().is_ok());
//! ```
//!
//! Where those three values come from (environment, file, secret store) is
//! up to the application. [`ApsConfig::from_env`] is a small helper for the
//! common environment-variable case:
//!
//! ```bash
//! export APS_CLIENT_ID=...
//! export APS_CLIENT_SECRET=...
//! export APS_CALLBACK_URL=https://app.example.com/oauth/callback
//! ```

use std::time::Duration;

use crate::{ApsError, ApsResult};

pub const DEFAULT_BASE_URL: &str = "https://developer.api.autodesk.com";

/// Scopes requested for the service-level (2-legged) token
pub const DEFAULT_SERVICE_SCOPES: &[&str] = &[
    "data:read",
    "data:write",
    "data:create",
    "bucket:create",
    "bucket:read",
];

/// Scopes requested for the delegated (3-legged) flow
pub const DEFAULT_DELEGATED_SCOPES: &[&str] = &["data:read", "data:write", "data:create", "viewables:read"];

/// Client configuration
#[derive(Clone)]
pub struct ApsConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Redirect URL registered for the authorization-code flow
    pub callback_url: String,
    /// Platform root, without trailing slash
    pub base_url: String,
    pub service_scopes: Vec<String>,
    pub delegated_scopes: Vec<String>,
    /// Token, manifest, job and view-list calls
    pub default_timeout: Duration,
    /// Full-content object uploads
    pub upload_timeout: Duration,
    /// Object tree and property collection calls
    pub metadata_timeout: Duration,
}

impl std::fmt::Debug for ApsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("callback_url", &self.callback_url)
            .field("base_url", &self.base_url)
            .field("service_scopes", &self.service_scopes)
            .field("delegated_scopes", &self.delegated_scopes)
            .field("default_timeout", &self.default_timeout)
            .field("upload_timeout", &self.upload_timeout)
            .field("metadata_timeout", &self.metadata_timeout)
            .finish()
    }
}

impl ApsConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            callback_url: callback_url.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            service_scopes: DEFAULT_SERVICE_SCOPES.iter().map(|s| s.to_string()).collect(),
            delegated_scopes: DEFAULT_DELEGATED_SCOPES.iter().map(|s| s.to_string()).collect(),
            default_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(300), // 5 minutes
            metadata_timeout: Duration::from_secs(180), // 3 minutes
        }
    }

    /// Read `<prefix>CLIENT_ID`, `<prefix>CLIENT_SECRET`, `<prefix>CALLBACK_URL`
    /// and the optional `<prefix>BASE_URL` from the environment.
    pub fn from_env(prefix: &str) -> ApsResult<Self> {
        let var = |name: &str| -> ApsResult<String> {
            let key = format!("{prefix}{name}");
            std::env::var(&key).map_err(|_| ApsError::config(format!("Missing environment variable {key}")))
        };

        let mut config = Self::new(var("CLIENT_ID")?, var("CLIENT_SECRET")?, var("CALLBACK_URL")?);
        if let Ok(base_url) = std::env::var(format!("{prefix}BASE_URL")) {
            config = config.with_base_url(base_url);
        }

        config.validate()?;
        Ok(config)
    }

    /// Override the platform root (useful for staging or a local stub)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_service_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.service_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_delegated_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.delegated_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    /// Join a path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn validate(&self) -> ApsResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(ApsError::config("Client ID cannot be empty"));
        }

        if self.client_secret.trim().is_empty() {
            return Err(ApsError::config("Client secret cannot be empty"));
        }

        if !is_http_url(&self.callback_url) {
            return Err(ApsError::config("Callback URL must be a valid HTTP/HTTPS URL"));
        }

        if !is_http_url(&self.base_url) {
            return Err(ApsError::config("Base URL must be a valid HTTP/HTTPS URL"));
        }

        if self.service_scopes.is_empty() {
            return Err(ApsError::config("At least one service scope is required"));
        }

        for (name, timeout) in [
            ("default", self.default_timeout),
            ("upload", self.upload_timeout),
            ("metadata", self.metadata_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ApsError::config(format!("The {name} timeout must be greater than 0")));
            }
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
