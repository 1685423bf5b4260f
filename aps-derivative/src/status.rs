//! Translation status normalization.
//!
//! The manifest endpoint reports `status` and `progress` in a loose
//! vocabulary that has changed over time. Callers get a stable
//! [`NormalizedStatus`] instead. Vendor values are matched exactly, so
//! `"SUCCESS"` is as unknown as `"reticulating"`. Anything the mapping does
//! not recognize is reported as [`TranslationState::Translating`] with
//! progress 0: an unknown value must never make a caller give up on (or
//! publish) a job.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a translation job stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationState {
    Translating,
    Complete,
    Failed,
}

impl TranslationState {
    /// Map a vendor status; unknown values stay `Translating`
    pub fn from_vendor(status: &str) -> Self {
        match status {
            "pending" | "inprogress" => TranslationState::Translating,
            "success" => TranslationState::Complete,
            "failed" | "timeout" => TranslationState::Failed,
            _ => TranslationState::Translating,
        }
    }

    /// No further polling will change the outcome
    pub fn is_terminal(&self) -> bool {
        matches!(self, TranslationState::Complete | TranslationState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationState::Translating => "translating",
            TranslationState::Complete => "complete",
            TranslationState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TranslationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The status contract exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedStatus {
    pub status: TranslationState,
    /// Always within `0..=100`
    pub progress: u8,
}

impl NormalizedStatus {
    pub fn normalize(status: Option<&str>, progress: Option<&Value>) -> Self {
        Self {
            status: status.map(TranslationState::from_vendor).unwrap_or(TranslationState::Translating),
            progress: parse_progress(progress),
        }
    }

    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self::normalize(manifest.status.as_deref(), manifest.progress.as_ref())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// The parts of a vendor manifest the core reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub urn: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Usually `"<n>% complete"` or `"complete"`, but not guaranteed
    #[serde(default)]
    pub progress: Option<Value>,
    #[serde(default)]
    pub has_derivatives: Option<bool>,
}

/// Read a vendor progress value.
///
/// `"<n>%"` (optionally followed by text) yields `n`, the literal `"complete"`
/// yields 100. Anything else, including numbers and missing values, is 0. The
/// result is clamped to `0..=100`.
pub fn parse_progress(progress: Option<&Value>) -> u8 {
    let Some(Value::String(raw)) = progress else {
        return 0;
    };

    if raw == "complete" {
        return 100;
    }

    let digits_end = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, rest) = raw.split_at(digits_end);
    if digits.is_empty() || !rest.starts_with('%') {
        return 0;
    }

    // Digits that overflow are still "more than 100".
    digits.parse::<u64>().map(|n| n.min(100) as u8).unwrap_or(100)
}
