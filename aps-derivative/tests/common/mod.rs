#![allow(dead_code)]

use std::sync::Arc;

use aps_auth::CredentialManager;
use aps_core::{ApsConfig, Method, StubTransport};
use serde_json::json;

pub const TOKEN: &str = "/authentication/v2/token";
pub const JOB: &str = "/modelderivative/v2/designdata/job";
pub const RAW_URN: &str = "urn:proj-1/model.rvt";
pub const ENCODED_URN: &str = "dXJuOnByb2otMS9tb2RlbC5ydnQ";

pub fn manifest_path() -> String {
    format!("/modelderivative/v2/designdata/{ENCODED_URN}/manifest")
}

pub fn metadata_path() -> String {
    format!("/modelderivative/v2/designdata/{ENCODED_URN}/metadata")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Stub backend with a working token endpoint
pub fn setup() -> (Arc<StubTransport>, Arc<CredentialManager>) {
    init_tracing();

    let stub = Arc::new(StubTransport::new());
    stub.on_json(
        Method::POST,
        TOKEN,
        200,
        json!({ "access_token": "svc-token", "token_type": "Bearer", "expires_in": 3599 }),
    );

    let config = ApsConfig::new("client", "secret", "https://app.example.com/callback")
        .with_base_url("http://aps.test");
    let credentials = Arc::new(CredentialManager::new(config, stub.clone()).unwrap());
    (stub, credentials)
}

pub fn manifest(status: &str, progress: &str) -> serde_json::Value {
    json!({
        "type": "manifest",
        "hasDerivatives": true,
        "version": "1.0",
        "urn": ENCODED_URN,
        "region": "US",
        "status": status,
        "progress": progress,
        "derivatives": []
    })
}
