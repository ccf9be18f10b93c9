//! Strategy enums shared by the configuration layer and the normalizer.

use serde::{Deserialize, Serialize};

/// How per-row fingerprints are computed.
///
/// Only row fingerprints honour this choice. Whole-file digests and ledger
/// entry hashes are always SHA-256.
///
/// `FastRolling` is a 32-bit non-cryptographic hash meant for throughput on
/// very large files. It is not collision resistant and must not back any
/// legal integrity claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashStrategy {
    #[default]
    Cryptographic,
    FastRolling,
}

/// What to do with rows whose timestamps cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampMode {
    /// Keep the row; the timestamp is absent and duration is 0.
    #[default]
    Lenient,
    /// Drop the row.
    Strict,
}
