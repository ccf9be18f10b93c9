//! Hash-chain primitives: entry hashing and chain verification.
//!
//! An entry's `current_hash` is the SHA-256 of the canonical JSON (sorted
//! keys, no whitespace) of the entry as it is exported, with the
//! `currentHash` key removed. The exported bundle therefore carries
//! everything needed to recompute every hash without this crate.
//!
//! Metadata numbers must be integers. Floating-point text differs between
//! JSON writers (`5e-7` here, `5e-07` in Python), so a float would make
//! the canonical bytes writer-dependent. `check_metadata` enforces this at
//! append time; fractional values belong in strings.

use serde_json::Value;

use ipdr_contracts::{
    audit::{AuditLogEntry, Metadata, VerificationResult},
    error::{IpdrError, IpdrResult},
};
use ipdr_core::hash::{canonical_json, sha256_hex};

/// `previous_hash` of the genesis entry.
pub const GENESIS_PREVIOUS_HASH: &str = "0";
/// Actor recorded on the genesis entry.
pub const GENESIS_ACTOR: &str = "system";
/// Subject recorded on the genesis entry.
pub const GENESIS_SUBJECT: &str = "SYSTEM_INIT";

const CURRENT_HASH_KEY: &str = "currentHash";

fn find_float(value: &Value, path: &str) -> Option<String> {
    match value {
        Value::Number(n) if n.is_f64() => Some(path.to_string()),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, item)| find_float(item, &format!("{path}[{i}]"))),
        Value::Object(map) => map
            .iter()
            .find_map(|(key, item)| find_float(item, &format!("{path}.{key}"))),
        _ => None,
    }
}

/// Reject metadata holding a non-integer number at any depth.
///
/// # Errors
///
/// Returns `IpdrError::Serialization` naming the offending path.
pub fn check_metadata(metadata: &Metadata) -> IpdrResult<()> {
    match metadata.iter().find_map(|(key, value)| find_float(value, key)) {
        Some(path) => Err(IpdrError::Serialization {
            reason: format!(
                "metadata value '{}' is not an integer; store fractional numbers as strings",
                path
            ),
        }),
        None => Ok(()),
    }
}

/// The exact bytes an entry's hash is computed over.
///
/// # Errors
///
/// Returns `IpdrError::Serialization` if the metadata cannot be serialized.
pub fn canonical_entry_json(entry: &AuditLogEntry) -> IpdrResult<Vec<u8>> {
    let mut value = serde_json::to_value(entry)?;
    if let Value::Object(map) = &mut value {
        map.remove(CURRENT_HASH_KEY);
    }
    canonical_json(&value)
}

/// Compute the hash an entry should carry, ignoring its stored `current_hash`.
///
/// # Errors
///
/// Returns `IpdrError::Serialization` if the metadata cannot be serialized.
pub fn hash_entry(entry: &AuditLogEntry) -> IpdrResult<String> {
    Ok(sha256_hex(canonical_entry_json(entry)?))
}

/// Verify linkage and hash correctness of a whole chain.
///
/// Every discrepancy is reported with its entry index; verification does not
/// stop at the first one. After a mismatch the walk continues from the
/// stored hash, so a single edited entry is reported once rather than
/// cascading through the rest of the chain.
///
/// A chain without entries has no genesis and is invalid.
pub fn verify_chain(entries: &[AuditLogEntry]) -> VerificationResult {
    let mut errors = Vec::new();

    if entries.is_empty() {
        errors.push("ledger has no genesis entry".to_string());
    }

    let mut expected_previous = GENESIS_PREVIOUS_HASH;
    for (index, entry) in entries.iter().enumerate() {
        if entry.previous_hash != expected_previous {
            errors.push(format!(
                "entry {}: previous hash mismatch (expected {}, found {})",
                index, expected_previous, entry.previous_hash
            ));
        }

        match hash_entry(entry) {
            Ok(computed) if computed == entry.current_hash => {}
            Ok(computed) => errors.push(format!(
                "entry {}: hash mismatch (stored {}, computed {})",
                index, entry.current_hash, computed
            )),
            Err(e) => errors.push(format!("entry {}: could not be hashed: {}", index, e)),
        }

        expected_previous = &entry.current_hash;
    }

    VerificationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use ipdr_contracts::audit::{AuditAction, Metadata};

    use super::*;

    fn entry(previous_hash: &str) -> AuditLogEntry {
        let mut metadata = Metadata::new();
        metadata.insert("filename".to_string(), Value::from("jio.csv"));
        let mut entry = AuditLogEntry {
            id: "entry-1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 8, 20, 10, 0, 0).unwrap(),
            actor: "si.verma".to_string(),
            action: AuditAction::Upload,
            subject: "file-1".to_string(),
            metadata,
            previous_hash: previous_hash.to_string(),
            current_hash: String::new(),
            ip_address: None,
            user_agent: None,
            location: None,
            device_fingerprint: None,
        };
        entry.current_hash = hash_entry(&entry).unwrap();
        entry
    }

    #[test]
    fn stored_hash_does_not_feed_its_own_hash() {
        let mut e = entry(GENESIS_PREVIOUS_HASH);
        let before = hash_entry(&e).unwrap();
        e.current_hash = "ffff".to_string();
        assert_eq!(hash_entry(&e).unwrap(), before);
    }

    #[test]
    fn context_fields_are_committed() {
        let mut e = entry(GENESIS_PREVIOUS_HASH);
        let before = hash_entry(&e).unwrap();
        e.ip_address = Some("10.0.0.7".to_string());
        assert_ne!(hash_entry(&e).unwrap(), before);
    }

    /// Pins the canonical form that the standalone verifier reproduces.
    #[test]
    fn canonical_bytes_are_sorted_and_compact() {
        let mut e = entry(GENESIS_PREVIOUS_HASH);
        e.metadata.insert("rows".to_string(), Value::from(12));
        e.metadata.insert("ratio".to_string(), Value::from("0.5"));
        e.ip_address = Some("10.0.0.7".to_string());

        let bytes = canonical_entry_json(&e).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            concat!(
                r#"{"action":"upload","actor":"si.verma","id":"entry-1","ipAddress":"10.0.0.7","#,
                r#""metadata":{"filename":"jio.csv","ratio":"0.5","rows":12},"#,
                r#""previousHash":"0","subject":"file-1","timestamp":"2025-08-20T10:00:00Z"}"#
            )
        );
    }

    #[test]
    fn float_metadata_is_rejected_at_any_depth() {
        let mut metadata = Metadata::new();
        metadata.insert("rows".to_string(), Value::from(12));
        metadata.insert("count".to_string(), Value::from(-3));
        assert!(check_metadata(&metadata).is_ok());

        metadata.insert("stats".to_string(), serde_json::json!({ "mbps": [1, 5e-7] }));
        match check_metadata(&metadata) {
            Err(IpdrError::Serialization { reason }) => {
                assert!(reason.contains("stats.mbps[1]"), "got {}", reason)
            }
            other => panic!("expected Serialization error, got {:?}", other),
        }

        let mut whole = Metadata::new();
        whole.insert("ratio".to_string(), Value::from(1e21));
        assert!(check_metadata(&whole).is_err());
    }

    #[test]
    fn empty_chain_is_invalid() {
        let result = verify_chain(&[]);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn wrong_genesis_link_is_reported() {
        let result = verify_chain(&[entry("abc")]);
        assert!(!result.is_valid);
        assert!(result.errors[0].starts_with("entry 0: previous hash mismatch"));
    }
}
