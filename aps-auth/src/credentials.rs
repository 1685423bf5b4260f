// Service-level (2-legged) credentials.

use std::sync::Arc;

use aps_core::{ApsConfig, ApsError, ApsResult, HttpTransport};
use chrono::{DateTime, Duration, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{AuthUrl, ClientId, ClientSecret, RedirectUrl, Scope, TokenResponse, TokenUrl};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::exchange::{send_token_request, token_error};

pub const TOKEN_PATH: &str = "authentication/v2/token";
pub const AUTHORIZE_PATH: &str = "authentication/v2/authorize";

/// Seconds shaved off the vendor-reported lifetime before a token is reused
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 60;

// Upper bound on a reported lifetime, keeps the date arithmetic in range.
const MAX_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// A cached service token
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceCredential {
    pub token: String,
    /// Already includes the safety margin
    pub expires_at: DateTime<Utc>,
}

impl ServiceCredential {
    pub fn from_lifetime(token: String, expires_in_secs: u64, now: DateTime<Utc>) -> Self {
        let lifetime = i64::try_from(expires_in_secs).unwrap_or(MAX_LIFETIME_SECS).min(MAX_LIFETIME_SECS);
        let usable = (lifetime - EXPIRY_SAFETY_MARGIN_SECS).max(0);
        Self {
            token,
            expires_at: now + Duration::seconds(usable),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl std::fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues and caches platform credentials.
///
/// One value is shared (behind an `Arc`) by every client; the cached service
/// token is the only mutable state in the workspace. Reads and writes of the
/// `{token, expires_at}` pair go through a lock so a caller never sees half of
/// a refresh. Concurrent callers that all find the cache stale may each run an
/// exchange; the last one to finish wins.
pub struct CredentialManager {
    config: Arc<ApsConfig>,
    transport: Arc<dyn HttpTransport>,
    oauth: BasicClient,
    cache: RwLock<Option<ServiceCredential>>,
}

impl CredentialManager {
    pub fn new(config: ApsConfig, transport: Arc<dyn HttpTransport>) -> ApsResult<Self> {
        config.validate()?;

        let oauth = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(config.url(AUTHORIZE_PATH)).map_err(|e| ApsError::config(e.to_string()))?,
            Some(TokenUrl::new(config.url(TOKEN_PATH)).map_err(|e| ApsError::config(e.to_string()))?),
        )
        .set_redirect_uri(RedirectUrl::new(config.callback_url.clone()).map_err(|e| ApsError::config(e.to_string()))?);

        Ok(Self {
            config: Arc::new(config),
            transport,
            oauth,
            cache: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &ApsConfig {
        &self.config
    }

    /// Transport shared with the storage and derivative clients
    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.transport)
    }

    pub(crate) fn oauth(&self) -> &BasicClient {
        &self.oauth
    }

    /// A service token that is valid right now, exchanging a new one if needed
    pub async fn service_token(&self) -> ApsResult<String> {
        Ok(self.service_credential().await?.token)
    }

    /// The cached credential, or a freshly exchanged one.
    ///
    /// A vendor lifetime at or below [`EXPIRY_SAFETY_MARGIN_SECS`] yields a
    /// credential whose `expires_at` is the exchange instant: the token is
    /// handed out once, straight from the vendor, and never served from cache.
    pub async fn service_credential(&self) -> ApsResult<ServiceCredential> {
        if let Some(cached) = self.cached_credential() {
            return Ok(cached);
        }
        self.refresh_service_token().await
    }

    /// Exchange a new service token and replace the cache, even if the cached
    /// one is still valid.
    #[instrument(skip(self), fields(client_id = %self.config.client_id))]
    pub async fn refresh_service_token(&self) -> ApsResult<ServiceCredential> {
        let scopes = self.config.service_scopes.iter().cloned().map(Scope::new);
        let token = self
            .oauth
            .exchange_client_credentials()
            .add_scopes(scopes)
            .request_async(|request| send_token_request(self.transport(), self.config.default_timeout, request))
            .await
            .map_err(token_error)?;

        let lifetime = lifetime_secs(&token);
        if lifetime <= EXPIRY_SAFETY_MARGIN_SECS as u64 {
            warn!(lifetime, "Service token lifetime is within the safety margin, it will not be reused");
        }

        let credential = ServiceCredential::from_lifetime(token.access_token().secret().clone(), lifetime, Utc::now());
        *self.cache.write() = Some(credential.clone());

        info!(expires_at = %credential.expires_at, "Issued service token");
        Ok(credential)
    }

    /// Drop the cached service token; the next call exchanges a new one
    pub fn invalidate_service_token(&self) {
        if self.cache.write().take().is_some() {
            debug!("Cleared cached service token");
        }
    }

    /// The cached credential, if it is still usable
    pub fn cached_credential(&self) -> Option<ServiceCredential> {
        let now = Utc::now();
        self.cache.read().as_ref().filter(|c| c.is_valid_at(now)).cloned()
    }

    #[cfg(test)]
    pub(crate) fn seed_cache(&self, credential: ServiceCredential) {
        *self.cache.write() = Some(credential);
    }
}

/// Seconds the vendor says a token lives; a missing value means none
pub(crate) fn lifetime_secs(token: &BasicTokenResponse) -> u64 {
    token.expires_in().map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aps_core::{Method, StubTransport};
    use serde_json::json;

    fn manager(stub: &Arc<StubTransport>) -> CredentialManager {
        let config = ApsConfig::new("client", "secret", "https://app.example.com/callback")
            .with_base_url("http://aps.test");
        CredentialManager::new(config, stub.clone()).unwrap()
    }

    #[test]
    fn safety_margin_is_subtracted() {
        let now = Utc::now();
        let cred = ServiceCredential::from_lifetime("t".into(), 3599, now);
        assert_eq!(cred.expires_at, now + Duration::seconds(3539));
        assert!(cred.is_valid_at(now));

        let short = ServiceCredential::from_lifetime("t".into(), 30, now);
        assert_eq!(short.expires_at, now);
        assert!(!short.is_valid_at(now));
    }

    #[test]
    fn debug_redacts_token() {
        let cred = ServiceCredential::from_lifetime("very-secret-token".into(), 100, Utc::now());
        assert!(!format!("{cred:?}").contains("very-secret-token"));
    }

    #[tokio::test]
    async fn client_credentials_request_shape() {
        let stub = Arc::new(StubTransport::new());
        stub.on_json(
            Method::POST,
            "/authentication/v2/token",
            200,
            json!({ "access_token": "svc-1", "token_type": "Bearer", "expires_in": 3599 }),
        );
        let manager = manager(&stub);

        assert_eq!(manager.service_token().await.unwrap(), "svc-1");

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.form_value("grant_type"), Some("client_credentials"));
        assert_eq!(
            req.form_value("scope"),
            Some("data:read data:write data:create bucket:create bucket:read")
        );
        // base64("client:secret")
        assert_eq!(req.header_value("authorization"), Some("Basic Y2xpZW50OnNlY3JldA=="));
    }

    #[tokio::test]
    async fn stale_cache_is_replaced() {
        let stub = Arc::new(StubTransport::new());
        stub.on_json(
            Method::POST,
            "/authentication/v2/token",
            200,
            json!({ "access_token": "fresh", "token_type": "Bearer", "expires_in": 3599 }),
        );
        let manager = manager(&stub);
        manager.seed_cache(ServiceCredential {
            token: "stale".into(),
            expires_at: Utc::now() - Duration::seconds(1),
        });

        assert!(manager.cached_credential().is_none());
        assert_eq!(manager.service_token().await.unwrap(), "fresh");
        assert_eq!(manager.cached_credential().unwrap().token, "fresh");
    }

    #[tokio::test]
    async fn lifetime_within_margin_is_returned_once_but_never_reused() {
        let stub = Arc::new(StubTransport::new());
        stub.on_json(
            Method::POST,
            "/authentication/v2/token",
            200,
            json!({ "access_token": "brief", "token_type": "Bearer", "expires_in": 60 }),
        );
        let manager = manager(&stub);

        let before = Utc::now();
        let credential = manager.service_credential().await.unwrap();
        assert_eq!(credential.token, "brief");
        // expires_at is the exchange instant, so it is already stale on return.
        assert!(credential.expires_at >= before);
        assert!(!credential.is_valid_at(Utc::now()));
        assert!(manager.cached_credential().is_none());

        manager.service_credential().await.unwrap();
        assert_eq!(stub.count(Method::POST, "/authentication/v2/token"), 2);
    }

    #[tokio::test]
    async fn failed_exchange_is_upstream_auth_and_keeps_cache_empty() {
        let stub = Arc::new(StubTransport::new());
        stub.on_json(
            Method::POST,
            "/authentication/v2/token",
            401,
            json!({ "developerMessage": "The client_id specified does not have access" }),
        );
        let manager = manager(&stub);

        let err = manager.service_token().await.unwrap_err();
        assert!(matches!(err, ApsError::UpstreamAuth { status: 401, .. }));
        assert!(manager.cached_credential().is_none());
    }

    #[test]
    fn rejects_invalid_config() {
        let stub = Arc::new(StubTransport::new());
        let config = ApsConfig::new("", "secret", "https://app.example.com/callback");
        assert!(matches!(
            CredentialManager::new(config, stub),
            Err(ApsError::Config { .. })
        ));
    }
}
