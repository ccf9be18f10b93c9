//! Ledger export, restore, and the standalone verification script.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use ipdr_contracts::{
    audit::{AuditLogEntry, LedgerExport, VerificationResult},
    error::{IpdrError, IpdrResult},
};
use ipdr_core::{hash::canonical_hash, traits::EnvironmentContextProvider};

use crate::{
    chain::verify_chain,
    ledger::{now_millis, CustodyLedger, LedgerState},
};

/// The export bundle minus its own hash.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnsealedExport<'a> {
    audit_log: &'a [AuditLogEntry],
    head_hash: &'a str,
    export_timestamp: &'a DateTime<Utc>,
}

/// SHA-256 over the canonical JSON of the bundle without `exportHash`.
pub fn export_hash(
    audit_log: &[AuditLogEntry],
    head_hash: &str,
    export_timestamp: &DateTime<Utc>,
) -> IpdrResult<String> {
    canonical_hash(&UnsealedExport {
        audit_log,
        head_hash,
        export_timestamp,
    })
}

/// Check an exported bundle: chain, head hash, and export hash.
pub fn verify_export(export: &LedgerExport) -> VerificationResult {
    let mut result = verify_chain(&export.audit_log);

    match export.audit_log.last() {
        Some(last) if last.current_hash != export.head_hash => {
            result.errors.push(format!(
                "head hash {} does not match entry {}",
                export.head_hash,
                export.audit_log.len() - 1
            ));
        }
        _ => {}
    }

    match export_hash(&export.audit_log, &export.head_hash, &export.export_timestamp) {
        Ok(computed) if computed == export.export_hash => {}
        Ok(computed) => result.errors.push(format!(
            "export hash mismatch (stored {}, computed {})",
            export.export_hash, computed
        )),
        Err(e) => result.errors.push(format!("export could not be hashed: {}", e)),
    }

    result.is_valid = result.errors.is_empty();
    result
}

impl CustodyLedger {
    /// Snapshot the ledger as a sealed, self-verifying bundle.
    ///
    /// # Errors
    ///
    /// Returns `IpdrError::Serialization` if the bundle cannot be hashed.
    pub fn export(&self) -> IpdrResult<LedgerExport> {
        let (audit_log, head_hash) = {
            let state = self.state.lock().map_err(|e| IpdrError::LedgerWrite {
                reason: format!("ledger lock poisoned: {}", e),
            })?;
            (state.entries.clone(), state.head_hash.clone())
        };
        let export_timestamp = now_millis();
        let export_hash = export_hash(&audit_log, &head_hash, &export_timestamp)?;

        info!(
            entries = audit_log.len(),
            head_hash = %head_hash,
            export_hash = %export_hash,
            "custody ledger exported"
        );

        Ok(LedgerExport {
            audit_log,
            head_hash,
            export_timestamp,
            export_hash,
        })
    }

    /// Rebuild a ledger from an exported bundle and continue appending to it.
    ///
    /// # Errors
    ///
    /// Returns `IpdrError::IntegrityViolation` listing every discrepancy if
    /// the bundle does not verify.
    pub fn from_export(
        export: LedgerExport,
        environment: Arc<dyn EnvironmentContextProvider>,
    ) -> IpdrResult<Self> {
        let result = verify_export(&export);
        if !result.is_valid {
            warn!(errors = result.errors.len(), "rejected custody ledger export");
            return Err(IpdrError::IntegrityViolation {
                reason: result.errors.join("; "),
            });
        }

        info!(
            entries = export.audit_log.len(),
            head_hash = %export.head_hash,
            "custody ledger restored"
        );

        Ok(Self {
            state: Mutex::new(LedgerState {
                entries: export.audit_log,
                head_hash: export.head_hash,
            }),
            environment,
        })
    }
}

/// A dependency-free Python 3 script that re-verifies an export bundle.
///
/// Usage: `python3 verify_ledger.py ledger_export.json`. Exits 0 when the
/// chain, head hash, and export hash all check out.
pub fn verification_script() -> &'static str {
    VERIFICATION_SCRIPT
}

const VERIFICATION_SCRIPT: &str = r#"#!/usr/bin/env python3
"""Independent verifier for an IPDR-Intel+ chain-of-custody export.

Recomputes every entry hash as SHA-256 over canonical JSON (sorted keys,
no whitespace, UTF-8) of the entry without "currentHash", checks each
entry links to its predecessor ("0" for genesis), then checks the head
hash and the export hash over the bundle without "exportHash".

Metadata numbers are integers, so no float formatting enters the hash.
Bundles holding fractional numbers or keys outside the entry schema are
rejected rather than hashed.
"""
import hashlib
import json
import sys

ENTRY_KEYS = {
    "id", "timestamp", "actor", "action", "subject", "metadata",
    "previousHash", "currentHash",
    "ipAddress", "userAgent", "location", "deviceFingerprint",
}
BUNDLE_KEYS = {"auditLog", "headHash", "exportTimestamp", "exportHash"}


def reject_float(text):
    raise ValueError("non-integer number %s in bundle" % text)


def canonical(value):
    return json.dumps(value, sort_keys=True, separators=(",", ":"), ensure_ascii=False)


def sha256(value):
    return hashlib.sha256(canonical(value).encode("utf-8")).hexdigest()


def verify(bundle):
    errors = []
    for key in sorted(set(bundle) - BUNDLE_KEYS):
        errors.append("bundle: unknown key %r" % key)
    log = bundle.get("auditLog") or []
    if not log:
        errors.append("ledger has no genesis entry")

    expected_previous = "0"
    for index, entry in enumerate(log):
        for key in sorted(set(entry) - ENTRY_KEYS):
            errors.append("entry %d: unknown key %r" % (index, key))
        if entry.get("previousHash") != expected_previous:
            errors.append("entry %d: previous hash mismatch" % index)
        body = {k: v for k, v in entry.items() if k != "currentHash"}
        if sha256(body) != entry.get("currentHash"):
            errors.append("entry %d: hash mismatch" % index)
        expected_previous = entry.get("currentHash")

    if log and log[-1].get("currentHash") != bundle.get("headHash"):
        errors.append("head hash does not match entry %d" % (len(log) - 1))

    unsealed = {k: v for k, v in bundle.items() if k != "exportHash"}
    if sha256(unsealed) != bundle.get("exportHash"):
        errors.append("export hash mismatch")
    return errors


def main():
    if len(sys.argv) != 2:
        print("usage: %s <ledger_export.json>" % sys.argv[0], file=sys.stderr)
        return 2
    try:
        with open(sys.argv[1], encoding="utf-8") as handle:
            bundle = json.load(handle, parse_float=reject_float)
    except ValueError as error:
        print("FAIL  %s" % error)
        return 1
    errors = verify(bundle)
    for error in errors:
        print("FAIL  " + error)
    if errors:
        return 1
    print("OK    %d entries, head %s" % (len(bundle["auditLog"]), bundle["headHash"]))
    return 0


if __name__ == "__main__":
    sys.exit(main())
"#;
