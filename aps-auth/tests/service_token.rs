use std::sync::Arc;

use aps_auth::CredentialManager;
use aps_core::{ApsConfig, Method, StubTransport};
use serde_json::json;

const TOKEN: &str = "/authentication/v2/token";

fn setup() -> (Arc<StubTransport>, Arc<CredentialManager>) {
    let stub = Arc::new(StubTransport::new());
    let config = ApsConfig::new("client", "secret", "https://app.example.com/callback")
        .with_base_url("http://aps.test");
    let manager = CredentialManager::new(config, stub.clone()).unwrap();
    (stub, Arc::new(manager))
}

fn token(stub: &StubTransport, value: &str, expires_in: u64) {
    stub.on_json(
        Method::POST,
        TOKEN,
        200,
        json!({ "access_token": value, "token_type": "Bearer", "expires_in": expires_in }),
    );
}

#[tokio::test]
async fn cached_token_is_reused_within_lifetime() {
    let (stub, manager) = setup();
    token(&stub, "svc-1", 3599);

    let first = manager.service_token().await.unwrap();
    let second = manager.service_token().await.unwrap();

    assert_eq!(first, "svc-1");
    assert_eq!(first, second);
    assert_eq!(stub.count(Method::POST, TOKEN), 1);
}

#[tokio::test]
async fn expired_token_triggers_exactly_one_exchange() {
    let (stub, manager) = setup();
    // A 60 second lifetime is fully eaten by the safety margin.
    token(&stub, "short-lived", 60);
    token(&stub, "svc-2", 3599);

    assert_eq!(manager.service_token().await.unwrap(), "short-lived");
    assert_eq!(stub.count(Method::POST, TOKEN), 1);

    assert_eq!(manager.service_token().await.unwrap(), "svc-2");
    assert_eq!(stub.count(Method::POST, TOKEN), 2);

    assert_eq!(manager.service_token().await.unwrap(), "svc-2");
    assert_eq!(stub.count(Method::POST, TOKEN), 2);
}

#[tokio::test]
async fn explicit_refresh_replaces_cached_token() {
    let (stub, manager) = setup();
    token(&stub, "svc-1", 3599);
    token(&stub, "svc-2", 3599);

    assert_eq!(manager.service_token().await.unwrap(), "svc-1");
    let refreshed = manager.refresh_service_token().await.unwrap();
    assert_eq!(refreshed.token, "svc-2");
    assert_eq!(manager.service_token().await.unwrap(), "svc-2");
    assert_eq!(stub.count(Method::POST, TOKEN), 2);
}

#[tokio::test]
async fn invalidate_forces_new_exchange() {
    let (stub, manager) = setup();
    token(&stub, "svc-1", 3599);

    manager.service_token().await.unwrap();
    manager.invalidate_service_token();
    assert!(manager.cached_credential().is_none());

    manager.service_token().await.unwrap();
    assert_eq!(stub.count(Method::POST, TOKEN), 2);
}

#[tokio::test]
async fn concurrent_callers_never_see_a_torn_credential() {
    let (stub, manager) = setup();
    token(&stub, "svc-1", 3599);

    let tasks = (0..16).map(|_| {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.service_credential().await })
    });

    for result in futures::future::join_all(tasks).await {
        let credential = result.unwrap().unwrap();
        assert_eq!(credential.token, "svc-1");
        assert!(credential.expires_at > chrono::Utc::now());
    }

    // Racing callers may each exchange, but never more than once apiece.
    let exchanges = stub.count(Method::POST, TOKEN);
    assert!((1..=16).contains(&exchanges));
    assert_eq!(manager.cached_credential().unwrap().token, "svc-1");
}
