//! Shared hashing utilities.
//!
//! Every integrity-relevant digest in the workspace (whole-file digests,
//! ledger entry hashes, export and certificate hashes) goes through
//! `sha256_hex` or `canonical_hash`. Row fingerprints go through
//! `fingerprint`, which honours the caller's `HashStrategy`.
//!
//! Canonical JSON relies on `serde_json::Value` keeping object keys in a
//! `BTreeMap`, i.e. sorted. The `preserve_order` feature of `serde_json` must
//! stay disabled for that to hold.

use std::io::{self, Read};

use serde::Serialize;
use sha2::{Digest, Sha256};

use ipdr_contracts::{config::HashStrategy, error::IpdrResult};

/// Name recorded in reports for the digest algorithm.
pub const HASH_ALGORITHM: &str = "SHA-256";

/// SHA-256 of `bytes` as a lowercase 64-character hex string.
pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(bytes.as_ref()))
}

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// SHA-256 of everything `reader` yields, read in fixed-size blocks.
///
/// # Errors
///
/// Returns the first read error other than `Interrupted`.
pub fn sha256_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// 32-bit multiplicative rolling hash (`h = h * 31 + unit`) over the UTF-16
/// code units of `input`, as 8 lowercase hex characters.
///
/// Not collision resistant.
pub fn rolling_hash_hex(input: &str) -> String {
    let hash = input
        .encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(u32::from(unit)));
    format!("{hash:08x}")
}

/// Row fingerprint of `input` under `strategy`.
pub fn fingerprint(strategy: HashStrategy, input: &str) -> String {
    match strategy {
        HashStrategy::Cryptographic => sha256_hex(input),
        HashStrategy::FastRolling => rolling_hash_hex(input),
    }
}

/// Compact JSON of `value` with object keys sorted at every depth.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> IpdrResult<Vec<u8>> {
    // Round-tripping through Value re-orders struct fields and map keys.
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&value)?)
}

/// SHA-256 over the canonical JSON of `value`.
pub fn canonical_hash<T: Serialize + ?Sized>(value: &T) -> IpdrResult<String> {
    Ok(sha256_hex(canonical_json(value)?))
}

/// True when `s` looks like a lowercase hex SHA-256 digest.
pub fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
