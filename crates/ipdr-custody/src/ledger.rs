//! The in-process chain-of-custody ledger.
//!
//! `CustodyLedger` owns an append-only `Vec<AuditLogEntry>` behind a
//! `Mutex`. Computing an entry's hash, pushing it, and advancing the head
//! all happen under one lock acquisition, so concurrent callers can never
//! link two entries to the same predecessor. Commit order is append order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use ipdr_contracts::{
    audit::{AuditAction, AuditLogEntry, EntryContext, Metadata, VerificationResult},
    error::{IpdrError, IpdrResult},
};
use ipdr_core::traits::{AuditSink, EnvironmentContextProvider};

use crate::chain::{
    check_metadata, hash_entry, verify_chain, GENESIS_ACTOR, GENESIS_PREVIOUS_HASH, GENESIS_SUBJECT,
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct LedgerState {
    /// Every entry, genesis first.
    pub(crate) entries: Vec<AuditLogEntry>,

    /// `current_hash` of the newest entry.
    pub(crate) head_hash: String,
}

/// Current time at millisecond precision, as it survives export.
pub(crate) fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

// ── Public ledger ─────────────────────────────────────────────────────────────

/// Append-only, SHA-256 hash-chained chain-of-custody ledger.
///
/// There is no global instance. Construct one per deployment and share it as
/// `Arc<CustodyLedger>`; it also serves as the pipeline's `AuditSink`.
pub struct CustodyLedger {
    pub(crate) state: Mutex<LedgerState>,
    pub(crate) environment: Arc<dyn EnvironmentContextProvider>,
}

impl CustodyLedger {
    /// Create a ledger holding only its genesis entry.
    ///
    /// # Errors
    ///
    /// Returns `IpdrError::Serialization` if the genesis entry cannot be hashed.
    pub fn new(environment: Arc<dyn EnvironmentContextProvider>) -> IpdrResult<Self> {
        let description = environment.describe();
        let mut metadata = Metadata::new();
        metadata.insert("event".to_string(), Value::from("ledger_initialized"));
        metadata.insert("software".to_string(), Value::from(description.software));
        metadata.insert(
            "softwareVersion".to_string(),
            Value::from(description.software_version),
        );
        metadata.insert(
            "hashAlgorithm".to_string(),
            Value::from(description.hash_algorithm),
        );

        let genesis = Self::seal_entry(
            GENESIS_ACTOR,
            AuditAction::Upload,
            GENESIS_SUBJECT,
            metadata,
            GENESIS_PREVIOUS_HASH,
            EntryContext::default(),
        )?;

        info!(genesis_hash = %genesis.current_hash, "custody ledger initialized");

        let state = LedgerState {
            head_hash: genesis.current_hash.clone(),
            entries: vec![genesis],
        };
        Ok(Self {
            state: Mutex::new(state),
            environment,
        })
    }

    /// Build and hash a new entry linked to `previous_hash`.
    fn seal_entry(
        actor: &str,
        action: AuditAction,
        subject: &str,
        metadata: Metadata,
        previous_hash: &str,
        context: EntryContext,
    ) -> IpdrResult<AuditLogEntry> {
        check_metadata(&metadata)?;
        let mut entry = AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: now_millis(),
            actor: actor.to_string(),
            action,
            subject: subject.to_string(),
            metadata,
            previous_hash: previous_hash.to_string(),
            current_hash: String::new(),
            ip_address: None,
            user_agent: None,
            location: None,
            device_fingerprint: None,
        };
        entry.set_context(context);
        entry.current_hash = hash_entry(&entry)?;
        Ok(entry)
    }

    /// Shared read access. A poisoned lock still holds a consistent chain,
    /// since an entry is only pushed once fully built.
    fn read(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one entry and return it.
    ///
    /// `context` defaults to whatever the environment provider captures.
    ///
    /// # Errors
    ///
    /// Returns `IpdrError::LedgerWrite` if the ledger lock is poisoned and
    /// `IpdrError::Serialization` if the metadata holds a non-integer number
    /// or cannot be hashed. Nothing is appended in any of these cases.
    pub fn add_entry(
        &self,
        actor: &str,
        action: AuditAction,
        subject: &str,
        metadata: Metadata,
        context: Option<EntryContext>,
    ) -> IpdrResult<AuditLogEntry> {
        let context = context.unwrap_or_else(|| self.environment.capture());

        let mut state = self.state.lock().map_err(|e| IpdrError::LedgerWrite {
            reason: format!("ledger lock poisoned: {}", e),
        })?;

        let entry = Self::seal_entry(actor, action, subject, metadata, &state.head_hash, context)?;
        state.head_hash = entry.current_hash.clone();
        state.entries.push(entry.clone());

        debug!(
            index = state.entries.len() - 1,
            actor = %entry.actor,
            action = %entry.action,
            subject = %entry.subject,
            hash = %entry.current_hash,
            "custody entry appended"
        );

        Ok(entry)
    }

    /// Snapshot of every entry, genesis first.
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.read().entries.clone()
    }

    /// Entries about `subject`, in append order.
    pub fn entries_for_subject(&self, subject: &str) -> Vec<AuditLogEntry> {
        self.read()
            .entries
            .iter()
            .filter(|e| e.subject == subject)
            .cloned()
            .collect()
    }

    /// Entries recording `action`, in append order.
    pub fn entries_by_action(&self, action: AuditAction) -> Vec<AuditLogEntry> {
        self.read()
            .entries
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }

    pub fn head_hash(&self) -> String {
        self.read().head_hash.clone()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Always false: the genesis entry is created on construction.
    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Re-verify the whole chain from genesis.
    pub fn verify(&self) -> VerificationResult {
        let state = self.read();
        let mut result = verify_chain(&state.entries);
        if let Some(last) = state.entries.last() {
            if last.current_hash != state.head_hash {
                result.is_valid = false;
                result.errors.push(format!(
                    "head hash {} does not match entry {}",
                    state.head_hash,
                    state.entries.len() - 1
                ));
            }
        }
        result
    }

    pub fn environment(&self) -> &Arc<dyn EnvironmentContextProvider> {
        &self.environment
    }
}

// ── AuditSink impl ────────────────────────────────────────────────────────────

impl AuditSink for CustodyLedger {
    fn append(
        &self,
        actor: &str,
        action: AuditAction,
        subject: &str,
        metadata: Metadata,
    ) -> IpdrResult<AuditLogEntry> {
        self.add_entry(actor, action, subject, metadata, None)
    }
}
