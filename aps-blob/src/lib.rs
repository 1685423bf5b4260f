//! # aps-blob: bucket and object storage
//!
//! Gets a model file onto the platform so it can be translated.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aps_auth::CredentialManager;
//! use aps_blob::ObjectStoreClient;
//! use aps_core::{ApsConfig, ApsResult, ReqwestTransport};
//!
//! # async fn run() -> ApsResult<()> {
//! let config = ApsConfig::from_env("APS_")?;
//! let credentials = Arc::new(CredentialManager::new(config, Arc::new(ReqwestTransport::new()?))?);
//! let store = ObjectStoreClient::new(credentials);
//!
//! store.ensure_bucket("proj-1").await?;
//! let object = store
//!     .upload_object("proj-1", "model.rvt", std::fs::read("model.rvt").unwrap_or_default(), "application/octet-stream")
//!     .await?;
//!
//! // `object.object_id` is the URN handed to the translation client.
//! println!("{}", object.urn());
//! # Ok(())
//! # }
//! ```
//!
//! Uploads are a single full-content PUT, so repeating one leaves the same end
//! state. There is no checksum verification or deduplication.

pub mod store;
mod types;

pub use store::{object_path, ObjectStoreClient};
pub use types::{
    validate_bucket_key, validate_object_key, BucketInfo, BucketPolicy, StoredObject, StoredObjectRef,
};
