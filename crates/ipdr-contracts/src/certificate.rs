//! BSA Section 63 certificate types.
//!
//! A certificate is a point-in-time attestation about one evidence file. The
//! `body` is what gets hashed; `certificate_hash` and `signature` sit outside
//! it so they never feed into their own computation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Operator;

/// Expert attestation details supplied by the operator generating the certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertAttestation {
    pub name: String,
    pub designation: String,
    pub credentials: String,
    pub organization: String,
}

/// Device and software environment the evidence was processed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDescription {
    pub system: String,
    pub software: String,
    pub software_version: String,
    pub hash_algorithm: String,
}

/// Identifiers and provenance of the certified evidence file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertifiedEvidence {
    pub evidence_id: String,
    pub filename: String,
    pub size: u64,
    pub operator: Operator,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Original-versus-current hash comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityStatus {
    pub original_hash: String,
    pub current_hash: String,
    pub is_intact: bool,
    /// Whether the custody ledger itself verified at generation time.
    pub ledger_valid: bool,
}

/// One line of the access-log narrative derived from ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogLine {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub entry_hash: String,
    pub narrative: String,
}

/// Everything covered by the certificate hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateBody {
    pub certificate_id: String,
    pub generated_at: DateTime<Utc>,
    pub case_id: String,
    pub evidence: CertifiedEvidence,
    pub environment: EnvironmentDescription,
    pub methodology: Vec<String>,
    pub integrity: IntegrityStatus,
    pub access_log: Vec<AccessLogLine>,
    pub expert: ExpertAttestation,
}

/// A generated BSA Section 63 certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BsaCertificate {
    pub body: CertificateBody,
    /// SHA-256 over the canonical JSON of `body`.
    pub certificate_hash: String,
    /// SHA-256 binding `certificate_hash` to the expert name and generation time.
    pub signature: String,
}
