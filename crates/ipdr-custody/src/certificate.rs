//! Section 63 BSA evidence certificates.
//!
//! A certificate is built from the evidence record, the ledger's entries for
//! that evidence, the host description, and the expert's attestation. Its
//! hash covers the whole body; the signature binds that hash to the expert
//! and the generation time. Issuing a certificate is itself logged as an
//! `export` entry on the ledger.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use ipdr_contracts::{
    audit::{AuditAction, AuditLogEntry, Metadata, VerificationResult},
    certificate::{
        AccessLogLine, BsaCertificate, CertificateBody, CertifiedEvidence, EnvironmentDescription,
        ExpertAttestation, IntegrityStatus,
    },
    error::IpdrResult,
    evidence::EvidenceFile,
};
use ipdr_core::hash::{canonical_hash, sha256_hex};

use crate::ledger::{now_millis, CustodyLedger};

/// Fixed description of how evidence is handled, in certificate order.
pub const METHODOLOGY: [&str; 5] = [
    "The electronic record was received as an operator-supplied IPDR export and read without modification.",
    "A SHA-256 digest of the complete file was computed incrementally while the file was streamed.",
    "Each record was normalized to a canonical form and fingerprinted over its canonical fields.",
    "Every action on the evidence was appended to a SHA-256 hash-chained custody ledger linked to its predecessor.",
    "Ledger integrity was re-verified from the genesis entry at the time this certificate was generated.",
];

fn narrative(entry: &AuditLogEntry) -> String {
    let stage = entry
        .metadata
        .get("stage")
        .and_then(|v| v.as_str())
        .map(|s| format!(" ({})", s.replace('_', " ")))
        .unwrap_or_default();
    format!(
        "{} performed {}{} at {}",
        entry.actor,
        entry.action,
        stage,
        entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

fn access_line(entry: &AuditLogEntry) -> AccessLogLine {
    AccessLogLine {
        timestamp: entry.timestamp,
        actor: entry.actor.clone(),
        action: entry.action.as_str().to_string(),
        entry_hash: entry.current_hash.clone(),
        narrative: narrative(entry),
    }
}

/// Everything a certificate body is derived from.
pub struct CertificateInputs<'a> {
    pub certificate_id: String,
    pub generated_at: DateTime<Utc>,
    pub evidence: &'a EvidenceFile,
    /// Digest of the evidence as it exists now; `None` reuses the recorded one.
    pub current_sha256: Option<&'a str>,
    pub ledger_valid: bool,
    pub access_log: &'a [AuditLogEntry],
    pub environment: EnvironmentDescription,
    pub expert: ExpertAttestation,
}

/// Assemble a certificate body. Pure: equal inputs give equal bodies.
pub fn build_body(inputs: CertificateInputs<'_>) -> CertificateBody {
    let evidence = inputs.evidence;
    let current_hash = inputs
        .current_sha256
        .unwrap_or(&evidence.sha256)
        .to_string();

    CertificateBody {
        certificate_id: inputs.certificate_id,
        generated_at: inputs.generated_at,
        case_id: evidence.case_id.clone(),
        evidence: CertifiedEvidence {
            evidence_id: evidence.id.clone(),
            filename: evidence.filename.clone(),
            size: evidence.size,
            operator: evidence.operator,
            uploaded_by: evidence.uploaded_by.clone(),
            uploaded_at: evidence.uploaded_at,
        },
        environment: inputs.environment,
        methodology: METHODOLOGY.iter().map(|s| s.to_string()).collect(),
        integrity: IntegrityStatus {
            is_intact: current_hash == evidence.sha256,
            original_hash: evidence.sha256.clone(),
            current_hash,
            ledger_valid: inputs.ledger_valid,
        },
        access_log: inputs.access_log.iter().map(access_line).collect(),
        expert: inputs.expert,
    }
}

fn signature(certificate_hash: &str, body: &CertificateBody) -> String {
    sha256_hex(format!(
        "{}:{}:{}",
        certificate_hash,
        body.expert.name,
        body.generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    ))
}

/// Hash and sign a body.
///
/// # Errors
///
/// Returns `IpdrError::Serialization` if the body cannot be hashed.
pub fn seal(body: CertificateBody) -> IpdrResult<BsaCertificate> {
    let certificate_hash = canonical_hash(&body)?;
    let signature = signature(&certificate_hash, &body);
    Ok(BsaCertificate {
        body,
        certificate_hash,
        signature,
    })
}

/// Check a certificate's hash, signature, and internal consistency.
pub fn verify_certificate(certificate: &BsaCertificate) -> VerificationResult {
    let mut errors = Vec::new();

    match canonical_hash(&certificate.body) {
        Ok(computed) if computed == certificate.certificate_hash => {}
        Ok(computed) => errors.push(format!(
            "certificate hash mismatch (stored {}, computed {})",
            certificate.certificate_hash, computed
        )),
        Err(e) => errors.push(format!("certificate could not be hashed: {}", e)),
    }

    if signature(&certificate.certificate_hash, &certificate.body) != certificate.signature {
        errors.push("signature does not match certificate hash and expert".to_string());
    }

    let integrity = &certificate.body.integrity;
    if integrity.is_intact != (integrity.original_hash == integrity.current_hash) {
        errors.push("integrity status contradicts the recorded hashes".to_string());
    }

    VerificationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Issue a certificate for `evidence` and log the issuance on `ledger`.
///
/// The access log covers every ledger entry whose subject is the evidence
/// id, up to but excluding the issuance entry itself.
///
/// # Errors
///
/// Returns `IpdrError::Serialization` if the body cannot be hashed and
/// `IpdrError::LedgerWrite` if the issuance cannot be logged.
pub fn generate_certificate(
    ledger: &CustodyLedger,
    evidence: &EvidenceFile,
    current_sha256: Option<&str>,
    expert: ExpertAttestation,
) -> IpdrResult<BsaCertificate> {
    let access_log = ledger.entries_for_subject(&evidence.id);
    let ledger_valid = ledger.verify().is_valid;

    let body = build_body(CertificateInputs {
        certificate_id: Uuid::new_v4().to_string(),
        generated_at: now_millis(),
        evidence,
        current_sha256,
        ledger_valid,
        access_log: &access_log,
        environment: ledger.environment().describe(),
        expert,
    });
    let certificate = seal(body)?;

    let metadata: Metadata = [
        ("certificateId", json!(certificate.body.certificate_id)),
        ("certificateHash", json!(certificate.certificate_hash)),
        ("caseId", json!(evidence.case_id)),
        ("isIntact", json!(certificate.body.integrity.is_intact)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    ledger.add_entry(
        &certificate.body.expert.name,
        AuditAction::Export,
        &evidence.id,
        metadata,
        None,
    )?;

    info!(
        certificate_id = %certificate.body.certificate_id,
        evidence_id = %evidence.id,
        intact = certificate.body.integrity.is_intact,
        ledger_valid,
        "certificate issued"
    );

    Ok(certificate)
}
