use std::sync::Arc;

use aps_auth::CredentialManager;
use aps_core::{ApsResult, HttpRequest, HttpResponse, OpaqueId, Upstream};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::translation::DESIGNDATA_PATH;

/// One selectable 2D/3D viewable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewMetadata {
    pub name: String,
    pub role: String,
    pub guid: String,
    #[serde(default)]
    pub is_master_view: Option<bool>,
}

/// A node of a viewable's object hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(rename = "objectid")]
    pub object_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub objects: Vec<TreeNode>,
}

/// Object hierarchy of one viewable; empty while the vendor is still building it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectTree {
    #[serde(default)]
    pub objects: Vec<TreeNode>,
}

impl ObjectTree {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Every node, depth first
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[TreeNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.objects)).sum()
        }
        count(&self.objects)
    }
}

/// Flattened properties of one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    #[serde(rename = "objectid")]
    pub object_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub external_id: Option<String>,
    /// Category name -> property name -> value
    #[serde(default)]
    pub properties: Value,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct ViewList {
    #[serde(default)]
    metadata: Vec<ViewMetadata>,
}

#[derive(Deserialize)]
struct PropertyList {
    #[serde(default)]
    collection: Vec<PropertyRecord>,
}

/// Reads viewables, object trees and properties of a translated model.
///
/// Only meaningful once the translation status is `complete`. Nothing is
/// retried here.
pub struct MetadataClient {
    credentials: Arc<CredentialManager>,
}

impl MetadataClient {
    pub fn new(credentials: Arc<CredentialManager>) -> Self {
        Self { credentials }
    }

    /// Available viewables; an empty list is not an error
    #[instrument(skip(self))]
    pub async fn get_views(&self, raw_id: &str) -> ApsResult<Vec<ViewMetadata>> {
        let urn = OpaqueId::encode(raw_id);
        let path = format!("{DESIGNDATA_PATH}/{urn}/metadata");
        let timeout = self.credentials.config().default_timeout;

        let response = self.get(&path, timeout).await?;
        let views = decode_data::<ViewList>(&response)?.map(|l| l.metadata).unwrap_or_default();

        debug!(count = views.len(), "Fetched viewables");
        Ok(views)
    }

    /// Object hierarchy of the viewable `guid`
    #[instrument(skip(self))]
    pub async fn get_object_tree(&self, raw_id: &str, guid: &str) -> ApsResult<ObjectTree> {
        let urn = OpaqueId::encode(raw_id);
        let path = format!("{DESIGNDATA_PATH}/{urn}/metadata/{}", urlencoding::encode(guid));
        let timeout = self.credentials.config().metadata_timeout;

        let response = self.get(&path, timeout).await?;
        let tree = decode_data::<ObjectTree>(&response)?.unwrap_or_default();

        debug!(nodes = tree.node_count(), "Fetched object tree");
        Ok(tree)
    }

    /// Flattened property collection of the viewable `guid`
    #[instrument(skip(self))]
    pub async fn get_object_properties(&self, raw_id: &str, guid: &str) -> ApsResult<Vec<PropertyRecord>> {
        let urn = OpaqueId::encode(raw_id);
        let path = format!("{DESIGNDATA_PATH}/{urn}/metadata/{}/properties", urlencoding::encode(guid));
        let timeout = self.credentials.config().metadata_timeout;

        let response = self.get(&path, timeout).await?;
        let records = decode_data::<PropertyList>(&response)?
            .map(|l| l.collection)
            .unwrap_or_default();

        debug!(count = records.len(), "Fetched properties");
        Ok(records)
    }

    async fn get(&self, path: &str, timeout: std::time::Duration) -> ApsResult<HttpResponse> {
        let config = self.credentials.config();
        let token = self.credentials.service_token().await?;
        let request = HttpRequest::get(config.url(path), timeout).bearer(token);

        self.credentials
            .transport()
            .send(request)
            .await?
            .error_for(Upstream::Metadata)
    }
}

/// Unwrap the vendor `data` envelope.
///
/// `202 Accepted` means the vendor is still extracting and carries no data.
fn decode_data<T: DeserializeOwned>(response: &HttpResponse) -> ApsResult<Option<T>> {
    if response.status == 202 {
        debug!("Metadata still being extracted");
        return Ok(None);
    }

    let envelope: Envelope<T> = response.json()?;
    Ok(envelope.data)
}
