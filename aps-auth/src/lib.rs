//! # aps-auth: platform credentials
//!
//! [`CredentialManager`] owns the two OAuth grants the platform offers:
//!
//! - **Service (2-legged)**: a `client_credentials` token, cached until 60
//!   seconds before the vendor-reported expiry and shared by every client.
//! - **Delegated (3-legged)**: an authorization URL for user consent, then
//!   code exchange and refresh. These sessions are returned to the caller
//!   and never cached.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aps_auth::CredentialManager;
//! use aps_core::{ApsConfig, ApsResult, ReqwestTransport};
//!
//! # async fn run() -> ApsResult<()> {
//! let config = ApsConfig::from_env("APS_")?;
//! let manager = CredentialManager::new(config, Arc::new(ReqwestTransport::new()?))?;
//!
//! let token = manager.service_token().await?;
//! let consent = manager.authorization_url("csrf-state");
//! # let _ = (token, consent);
//! # Ok(())
//! # }
//! ```
//!
//! Token requests are built by `oauth2` and sent through the same
//! [`aps_core::HttpTransport`] as every other call.

pub mod credentials;
pub mod delegated;
mod exchange;

pub use credentials::{CredentialManager, ServiceCredential, EXPIRY_SAFETY_MARGIN_SECS};
pub use delegated::DelegatedSession;
