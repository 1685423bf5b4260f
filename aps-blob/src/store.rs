use std::sync::Arc;

use aps_auth::CredentialManager;
use aps_core::{ApsError, ApsResult, HttpRequest, Upstream};
use bytes::Bytes;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::types::{validate_bucket_key, validate_object_key, BucketInfo, BucketPolicy, StoredObject};

const BUCKETS_PATH: &str = "oss/v2/buckets";

/// Client for the platform's bucket and object endpoints.
///
/// Bucket creation is idempotent: a `409 Conflict` from the vendor means the
/// bucket is already there and is reported as success.
pub struct ObjectStoreClient {
    credentials: Arc<CredentialManager>,
    policy: BucketPolicy,
}

impl ObjectStoreClient {
    pub fn new(credentials: Arc<CredentialManager>) -> Self {
        Self {
            credentials,
            policy: BucketPolicy::Persistent,
        }
    }

    /// Retention policy used for buckets this client creates
    pub fn with_policy(mut self, policy: BucketPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create `bucket_key` unless it already exists
    #[instrument(skip(self), fields(policy = self.policy.as_str()))]
    pub async fn ensure_bucket(&self, bucket_key: &str) -> ApsResult<BucketInfo> {
        validate_bucket_key(bucket_key)?;

        let config = self.credentials.config();
        let token = self.credentials.service_token().await?;

        let request = HttpRequest::post(config.url(BUCKETS_PATH), config.default_timeout)
            .bearer(token)
            .json(json!({
                "bucketKey": bucket_key,
                "policyKey": self.policy.as_str(),
            }));

        let response = self.credentials.transport().send(request).await?;

        if response.status == 409 {
            debug!("Bucket already exists");
            return Ok(BucketInfo::existing(bucket_key));
        }

        let bucket: BucketInfo = response.error_for(Upstream::Storage)?.json()?;
        info!("Created bucket");
        Ok(bucket)
    }

    /// Upload `content` as the whole object, replacing any previous version
    #[instrument(skip(self, content))]
    pub async fn upload_object(
        &self,
        bucket_key: &str,
        object_key: &str,
        content: impl Into<Bytes> + Send,
        content_type: &str,
    ) -> ApsResult<StoredObject> {
        let content: Bytes = content.into();
        validate_bucket_key(bucket_key)?;
        validate_object_key(object_key)?;
        if content_type.trim().is_empty() {
            return Err(ApsError::invalid("Content type cannot be empty"));
        }

        let config = self.credentials.config();
        let token = self.credentials.service_token().await?;

        debug!(bytes = content.len(), "Uploading object");
        let url = config.url(&object_path(bucket_key, object_key));
        let request = HttpRequest::put(url, config.upload_timeout)
            .bearer(token)
            .binary(content, content_type);

        let object: StoredObject = self
            .credentials
            .transport()
            .send(request)
            .await?
            .error_for(Upstream::Storage)?
            .json()?;

        info!(object_id = %object.object_id, size = ?object.size, "Uploaded object");
        Ok(object)
    }
}

/// `oss/v2/buckets/{bucket}/objects/{object}` with the object key escaped
pub fn object_path(bucket_key: &str, object_key: &str) -> String {
    format!(
        "{BUCKETS_PATH}/{bucket_key}/objects/{}",
        urlencoding::encode(object_key)
    )
}
