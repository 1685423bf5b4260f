// Delegated (3-legged) flow: authorization URL, code exchange, refresh.

use aps_core::ApsResult;
use oauth2::basic::{BasicTokenResponse, BasicTokenType};
use oauth2::{AuthorizationCode, CsrfToken, RefreshToken, Scope, TokenResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::credentials::{lifetime_secs, CredentialManager};
use crate::exchange::{send_token_request, token_error};

/// Tokens issued on behalf of a user.
///
/// Returned to the caller as-is; nothing here is cached by the manager.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelegatedSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub token_type: Option<String>,
}

impl std::fmt::Debug for DelegatedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegatedSession")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

impl From<BasicTokenResponse> for DelegatedSession {
    fn from(token: BasicTokenResponse) -> Self {
        let token_type = match token.token_type() {
            BasicTokenType::Bearer => "Bearer".to_string(),
            BasicTokenType::Mac => "MAC".to_string(),
            BasicTokenType::Extension(other) => other.clone(),
        };
        Self {
            access_token: token.access_token().secret().clone(),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expires_in: lifetime_secs(&token),
            token_type: Some(token_type),
        }
    }
}

impl CredentialManager {
    /// URL to send the user to for consent.
    ///
    /// `state` is an opaque CSRF token; generating it and checking it on the
    /// callback is the caller's job.
    pub fn authorization_url(&self, state: &str) -> String {
        let state = state.to_string();
        let scopes = self.config().delegated_scopes.iter().cloned().map(Scope::new);

        let (url, _csrf) = self
            .oauth()
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(scopes)
            .url();

        url.to_string()
    }

    /// Trade the `code` from the callback for a delegated session
    #[instrument(skip(self, code))]
    pub async fn exchange_authorization_code(&self, code: &str) -> ApsResult<DelegatedSession> {
        let timeout = self.config().default_timeout;
        let token = self
            .oauth()
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(|request| send_token_request(self.transport(), timeout, request))
            .await
            .map_err(token_error)?;

        let session = DelegatedSession::from(token);
        info!(expires_in = session.expires_in, "Exchanged authorization code");
        Ok(session)
    }

    /// Renew a delegated session from its refresh token
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_delegated_session(&self, refresh_token: &str) -> ApsResult<DelegatedSession> {
        let timeout = self.config().default_timeout;
        let refresh_token = RefreshToken::new(refresh_token.to_string());
        let scopes = self.config().delegated_scopes.iter().cloned().map(Scope::new);

        let token = self
            .oauth()
            .exchange_refresh_token(&refresh_token)
            .add_scopes(scopes)
            .request_async(|request| send_token_request(self.transport(), timeout, request))
            .await
            .map_err(token_error)?;

        let session = DelegatedSession::from(token);
        info!(expires_in = session.expires_in, "Refreshed delegated session");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aps_core::{ApsConfig, ApsError, Method, StubTransport};
    use oauth2::url::Url;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    const TOKEN: &str = "/authentication/v2/token";

    fn manager(stub: &Arc<StubTransport>) -> CredentialManager {
        let config = ApsConfig::new("client", "secret", "https://app.example.com/oauth/callback")
            .with_base_url("http://aps.test");
        CredentialManager::new(config, stub.clone()).unwrap()
    }

    #[test]
    fn authorization_url_carries_client_scopes_and_state() {
        let stub = Arc::new(StubTransport::new());
        let manager = manager(&stub);

        let url = Url::parse(&manager.authorization_url("csrf-123")).unwrap();
        assert_eq!(url.path(), "/authentication/v2/authorize");

        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(query.get("client_id").map(String::as_str), Some("client"));
        assert_eq!(query.get("state").map(String::as_str), Some("csrf-123"));
        assert_eq!(
            query.get("redirect_uri").map(String::as_str),
            Some("https://app.example.com/oauth/callback")
        );
        assert_eq!(
            query.get("scope").map(String::as_str),
            Some("data:read data:write data:create viewables:read")
        );

        // Pure URL construction.
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn code_exchange_returns_session_verbatim() {
        let stub = Arc::new(StubTransport::new());
        stub.on_json(
            Method::POST,
            TOKEN,
            200,
            json!({
                "access_token": "user-access",
                "refresh_token": "user-refresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            }),
        );
        let manager = manager(&stub);

        let session = manager.exchange_authorization_code("the-code").await.unwrap();
        assert_eq!(
            session,
            DelegatedSession {
                access_token: "user-access".into(),
                refresh_token: Some("user-refresh".into()),
                expires_in: 3599,
                token_type: Some("Bearer".into()),
            }
        );

        let req = &stub.requests()[0];
        assert_eq!(req.form_value("grant_type"), Some("authorization_code"));
        assert_eq!(req.form_value("code"), Some("the-code"));
        assert_eq!(req.form_value("redirect_uri"), Some("https://app.example.com/oauth/callback"));

        // Delegated tokens never land in the service cache.
        assert!(manager.cached_credential().is_none());
    }

    #[tokio::test]
    async fn refresh_uses_refresh_grant() {
        let stub = Arc::new(StubTransport::new());
        stub.on_json(
            Method::POST,
            TOKEN,
            200,
            json!({ "access_token": "renewed", "refresh_token": "next", "token_type": "Bearer", "expires_in": 3599 }),
        );
        let manager = manager(&stub);

        let session = manager.refresh_delegated_session("old-refresh").await.unwrap();
        assert_eq!(session.access_token, "renewed");
        assert_eq!(session.refresh_token.as_deref(), Some("next"));

        let req = &stub.requests()[0];
        assert_eq!(req.form_value("grant_type"), Some("refresh_token"));
        assert_eq!(req.form_value("refresh_token"), Some("old-refresh"));
        assert_eq!(req.form_value("scope"), Some("data:read data:write data:create viewables:read"));
        assert_eq!(req.header_value("authorization"), Some("Basic Y2xpZW50OnNlY3JldA=="));
    }

    #[tokio::test]
    async fn rejected_grants_are_upstream_auth_errors() {
        let stub = Arc::new(StubTransport::new());
        stub.on_json(
            Method::POST,
            TOKEN,
            400,
            json!({ "error": "invalid_grant", "error_description": "The authorization code is invalid" }),
        );
        let manager = manager(&stub);

        let err = manager.exchange_authorization_code("bad").await.unwrap_err();
        assert!(matches!(err, ApsError::UpstreamAuth { status: 400, ref message } if message.contains("invalid")));

        let err = manager.refresh_delegated_session("bad").await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn debug_redacts_tokens() {
        let session = DelegatedSession {
            access_token: "a-secret".into(),
            refresh_token: Some("r-secret".into()),
            expires_in: 1,
            token_type: None,
        };
        let printed = format!("{session:?}");
        assert!(!printed.contains("a-secret"));
        assert!(!printed.contains("r-secret"));
    }
}
