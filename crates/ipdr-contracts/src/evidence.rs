//! Evidence file metadata and processing results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{CanonicalRecord, Operator};

/// Processing state a caller may attach to an `EvidenceFile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStatus {
    Processing,
    Completed,
    Failed,
}

/// Metadata describing a single uploaded file.
///
/// Identity fields are fixed once processing completes; `status` and
/// `record_count` are filled in by whoever drives the ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceFile {
    pub id: String,
    pub case_id: String,
    pub filename: String,
    /// Lowercase hex SHA-256 of the whole file content.
    pub sha256: String,
    pub size: u64,
    pub operator: Operator,
    pub storage_uri: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EvidenceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,
}

/// Case and uploader context supplied with every file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingContext {
    pub case_id: String,
    /// Evidence id assigned to the file; also stamped on every record.
    pub file_id: String,
    pub operator: Operator,
    pub uploaded_by: String,
}

impl ProcessingContext {
    /// Build a context with a freshly generated file id.
    pub fn new(case_id: impl Into<String>, operator: Operator, uploaded_by: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            file_id: Uuid::new_v4().to_string(),
            operator,
            uploaded_by: uploaded_by.into(),
        }
    }

    /// Storage location recorded on the evidence metadata.
    pub fn storage_uri(&self, filename: &str) -> String {
        format!("evidence://{}/{}/{}", self.case_id, self.file_id, filename)
    }
}

/// Everything a single file produced: its evidence metadata and records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFile {
    pub evidence: EvidenceFile,
    /// Records in source row order.
    pub records: Vec<CanonicalRecord>,
    /// Data rows that were dropped by the normalizer.
    pub skipped_rows: u64,
}
