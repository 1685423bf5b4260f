//! aps-core: shared building blocks for the aps client crates.
//!
//! - [`ApsError`] / [`ApsResult`]: the error taxonomy every client surfaces
//! - [`ApsConfig`]: client id, secret, callback URL and per-call timeouts
//! - [`OpaqueId`]: the URL-safe, unpadded base64 form of a resource URN
//! - [`HttpTransport`]: the seam all network traffic flows through

pub mod config;
pub mod errors;
pub mod transport;
pub mod urn;

#[cfg(any(test, feature = "stub"))]
pub mod stub;

pub use config::{ApsConfig, DEFAULT_BASE_URL, DEFAULT_DELEGATED_SCOPES, DEFAULT_SERVICE_SCOPES};
pub use errors::{vendor_message, ApsError, ApsResult, Upstream};
pub use transport::{
    Authorization, HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, RequestBody,
};
pub use urn::{encode_urn, OpaqueId};

#[cfg(any(test, feature = "stub"))]
pub use stub::StubTransport;
