//! Canonical IPDR record and operator types.
//!
//! Every telecom operator exports its session logs with its own column
//! names. The normalizer maps all of them onto `CanonicalRecord`, which is
//! what downstream analysis and reporting consume.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Telecom provider that produced an IPDR file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Jio,
    Airtel,
    Vodafone,
    Bsnl,
    Unknown,
}

impl Operator {
    /// Upper-case tag used in file metadata and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Jio => "JIO",
            Operator::Airtel => "AIRTEL",
            Operator::Vodafone => "VODAFONE",
            Operator::Bsnl => "BSNL",
            Operator::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = std::convert::Infallible;

    /// Case-insensitive; anything unrecognized maps to `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let operator = match s.trim().to_ascii_uppercase().as_str() {
            "JIO" | "RELIANCE JIO" | "RJIL" => Operator::Jio,
            "AIRTEL" | "BHARTI AIRTEL" => Operator::Airtel,
            "VODAFONE" | "VI" | "VODAFONE IDEA" => Operator::Vodafone,
            "BSNL" => Operator::Bsnl,
            _ => Operator::Unknown,
        };
        Ok(operator)
    }
}

/// One communication session extracted from an IPDR file.
///
/// Created once by the normalizer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    /// Unique within the source file.
    pub id: String,
    pub case_id: String,
    pub source_file_id: String,

    /// Initiating endpoint address.
    pub a_party: String,
    pub a_port: String,
    /// Recipient endpoint address.
    pub b_party: String,
    pub b_port: String,

    /// Upper-cased protocol name as found in the file (TCP, UDP, HTTP, ...).
    pub protocol: String,

    /// `None` when the source value could not be parsed.
    pub start_timestamp: Option<DateTime<Utc>>,
    pub end_timestamp: Option<DateTime<Utc>>,

    /// Whole seconds between start and end, never negative.
    pub duration: u64,

    pub bytes_transferred: u64,
    pub operator: Operator,

    /// Row fingerprint. Only a `Cryptographic` fingerprint is suitable for
    /// integrity claims; see `HashStrategy`.
    pub raw_row_hash: String,
}
