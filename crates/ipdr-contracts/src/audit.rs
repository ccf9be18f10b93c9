//! Chain-of-custody audit entry types.
//!
//! `AuditLogEntry` is a single link in the custody hash chain. The hashing
//! and verification logic lives in `ipdr-custody`; this module only defines
//! the shapes shared with report and UI collaborators.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What was done to the subject of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Upload,
    Parse,
    Analyze,
    Export,
    View,
    Modify,
    Delete,
    Verify,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Upload => "upload",
            AuditAction::Parse => "parse",
            AuditAction::Analyze => "analyze",
            AuditAction::Export => "export",
            AuditAction::View => "view",
            AuditAction::Modify => "modify",
            AuditAction::Delete => "delete",
            AuditAction::Verify => "verify",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open key-value bag attached to an entry. Ordered so it serializes the
/// same way every time.
pub type Metadata = BTreeMap<String, Value>;

/// Where and from what an action was performed.
///
/// Every field is optional; absent fields are left out of the entry hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_fingerprint: Option<String>,
}

/// One committed ledger record.
///
/// `current_hash` commits to every other field, including `previous_hash`,
/// so editing any committed entry breaks the chain from that point on.
///
/// Unknown keys are rejected on deserialize: the hash covers the entry's
/// JSON object as exported, so a key this type would drop must fail instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuditLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: AuditAction,
    /// The entity acted upon, usually an evidence or case id.
    pub subject: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub previous_hash: String,
    pub current_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_fingerprint: Option<String>,
}

impl AuditLogEntry {
    /// The platform context recorded on this entry.
    pub fn context(&self) -> EntryContext {
        EntryContext {
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
            location: self.location.clone(),
            device_fingerprint: self.device_fingerprint.clone(),
        }
    }

    pub fn set_context(&mut self, context: EntryContext) {
        self.ip_address = context.ip_address;
        self.user_agent = context.user_agent;
        self.location = context.location;
        self.device_fingerprint = context.device_fingerprint;
    }
}

/// Outcome of walking a hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub is_valid: bool,
    /// Every discrepancy found, in chain order. Empty when valid.
    pub errors: Vec<String>,
}

/// Self-contained ledger export handed to third parties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LedgerExport {
    pub audit_log: Vec<AuditLogEntry>,
    pub head_hash: String,
    pub export_timestamp: DateTime<Utc>,
    /// SHA-256 over the canonical form of the other three fields.
    pub export_hash: String,
}
