//! Batch manifest stored at the archive root as `results.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ArchiveError;
use crate::resolver::Resolution;

/// Outcome of one batch item. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub success: bool,
    /// The input URL, verbatim.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Name of the backend that resolved the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    #[must_use]
    pub fn succeeded(url: impl Into<String>, resolution: &Resolution) -> Self {
        let record = &resolution.record;
        Self {
            success: true,
            url: url.into(),
            id: Some(record.id.clone()),
            title: Some(record.title.clone()),
            author: Some(record.author.clone()),
            method: Some(resolution.backend.clone()),
            download_url: (!record.download_url.is_empty()).then(|| record.download_url.clone()),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: url.into(),
            id: None,
            title: None,
            author: None,
            method: None,
            download_url: None,
            error: Some(error.into()),
        }
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    /// Backend names in attempt order.
    pub methods_tried: Vec<String>,
    /// One entry per input URL, in input order.
    pub results: Vec<BatchItemResult>,
}

impl Manifest {
    /// Stamps a manifest with the current time.
    #[must_use]
    pub fn new(methods_tried: Vec<String>, results: Vec<BatchItemResult>) -> Self {
        Self {
            generated_at: Utc::now(),
            methods_tried,
            results,
        }
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }

    /// Pretty-printed JSON, as stored in the archive.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Manifest`] if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        serde_json::to_vec_pretty(self).map_err(|source| ArchiveError::Manifest { source })
    }
}
