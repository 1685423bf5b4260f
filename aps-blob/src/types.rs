use aps_core::{ApsError, ApsResult, OpaqueId};
use serde::{Deserialize, Serialize};

/// Retention policy applied when a bucket is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BucketPolicy {
    /// 24 hours
    Transient,
    /// 30 days
    Temporary,
    /// Until deleted
    #[default]
    Persistent,
}

impl BucketPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketPolicy::Transient => "transient",
            BucketPolicy::Temporary => "temporary",
            BucketPolicy::Persistent => "persistent",
        }
    }
}

/// Bucket details returned by `ensure_bucket`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketInfo {
    pub bucket_key: String,
    #[serde(default)]
    pub bucket_owner: Option<String>,
    /// Epoch milliseconds
    #[serde(default)]
    pub created_date: Option<i64>,
    #[serde(default)]
    pub policy_key: Option<BucketPolicy>,
    /// True when the bucket was there before this call (vendor answered 409)
    #[serde(skip)]
    pub already_existed: bool,
}

impl BucketInfo {
    pub(crate) fn existing(bucket_key: &str) -> Self {
        Self {
            bucket_key: bucket_key.to_string(),
            bucket_owner: None,
            created_date: None,
            policy_key: None,
            already_existed: true,
        }
    }
}

/// Object details returned by `upload_object`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub bucket_key: String,
    pub object_key: String,
    /// Raw URN of the object, the input to translation
    pub object_id: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl StoredObject {
    /// The object id in the form the derivative endpoints expect
    pub fn urn(&self) -> OpaqueId {
        OpaqueId::encode(&self.object_id)
    }
}

/// Caller-supplied bucket/object pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredObjectRef {
    pub bucket_key: String,
    pub object_key: String,
}

impl StoredObjectRef {
    pub fn new(bucket_key: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            bucket_key: bucket_key.into(),
            object_key: object_key.into(),
        }
    }
}

/// Bucket keys are 3-128 characters of `-_.a-z0-9`
pub fn validate_bucket_key(bucket_key: &str) -> ApsResult<()> {
    if !(3..=128).contains(&bucket_key.len()) {
        return Err(ApsError::invalid(format!(
            "Bucket key '{bucket_key}' must be between 3 and 128 characters"
        )));
    }

    let valid = bucket_key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(ApsError::invalid(format!(
            "Bucket key '{bucket_key}' may only contain lowercase letters, digits, '-', '_' and '.'"
        )));
    }

    Ok(())
}

pub fn validate_object_key(object_key: &str) -> ApsResult<()> {
    if object_key.trim().is_empty() {
        return Err(ApsError::invalid("Object key cannot be empty"));
    }
    Ok(())
}
