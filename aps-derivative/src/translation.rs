use std::sync::Arc;

use aps_auth::CredentialManager;
use aps_core::{ApsResult, HttpRequest, OpaqueId, Upstream};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::status::{Manifest, NormalizedStatus};

pub(crate) const DESIGNDATA_PATH: &str = "modelderivative/v2/designdata";

/// What a translation job asks the platform to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOptions {
    /// Output format, `svf2` is the viewer-ready one
    pub format: String,
    pub views: Vec<String>,
    pub generate_master_views: bool,
    /// Re-translate even when a derivative already exists
    pub force: bool,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            format: "svf2".to_string(),
            views: vec!["2d".to_string(), "3d".to_string()],
            generate_master_views: true,
            force: true,
        }
    }
}

impl TranslationOptions {
    fn job_body(&self, urn: &OpaqueId) -> Value {
        json!({
            "input": { "urn": urn.as_str() },
            "output": {
                "formats": [{
                    "type": self.format,
                    "views": self.views,
                    "advanced": { "generateMasterViews": self.generate_master_views },
                }]
            }
        })
    }
}

/// Vendor acknowledgement of a submitted job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub result: String,
    pub urn: String,
    #[serde(default)]
    pub accepted_jobs: Option<Value>,
}

/// Submits translation jobs and reports their normalized status.
///
/// There is no polling loop here: callers invoke [`get_translation_status`]
/// on whatever cadence suits them and stop once the state is terminal.
///
/// [`get_translation_status`]: TranslationClient::get_translation_status
pub struct TranslationClient {
    credentials: Arc<CredentialManager>,
    options: TranslationOptions,
}

impl TranslationClient {
    pub fn new(credentials: Arc<CredentialManager>) -> Self {
        Self {
            credentials,
            options: TranslationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TranslationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TranslationOptions {
        &self.options
    }

    /// Start translating the object identified by the raw URN `raw_id`.
    ///
    /// With the default options every call forces a fresh translation, so
    /// do not call this repeatedly for a model whose derivative you want to keep.
    #[instrument(skip(self))]
    pub async fn submit_translation(&self, raw_id: &str) -> ApsResult<JobInfo> {
        let urn = OpaqueId::encode(raw_id);
        let config = self.credentials.config();
        let token = self.credentials.service_token().await?;

        let mut request = HttpRequest::post(config.url(&format!("{DESIGNDATA_PATH}/job")), config.default_timeout)
            .bearer(token)
            .json(self.options.job_body(&urn));
        if self.options.force {
            request = request.header("x-ads-force", "true");
        }

        let job: JobInfo = self
            .credentials
            .transport()
            .send(request)
            .await?
            .error_for(Upstream::Translation)?
            .json()?;

        info!(%urn, result = %job.result, "Submitted translation job");
        Ok(job)
    }

    /// Fetch the manifest once and normalize its status and progress
    #[instrument(skip(self))]
    pub async fn get_translation_status(&self, raw_id: &str) -> ApsResult<NormalizedStatus> {
        let urn = OpaqueId::encode(raw_id);
        let config = self.credentials.config();
        let token = self.credentials.service_token().await?;

        let request = HttpRequest::get(config.url(&format!("{DESIGNDATA_PATH}/{urn}/manifest")), config.default_timeout)
            .bearer(token);

        let manifest: Manifest = self
            .credentials
            .transport()
            .send(request)
            .await?
            .error_for(Upstream::Translation)?
            .json()?;

        let status = NormalizedStatus::from_manifest(&manifest);
        debug!(
            vendor_status = ?manifest.status,
            vendor_progress = ?manifest.progress,
            status = %status.status,
            progress = status.progress,
            "Normalized manifest"
        );
        Ok(status)
    }
}
