//! Row normalization into `CanonicalRecord`.
//!
//! Pipeline per row:
//!
//! 1. Resolve logical fields from their synonyms (`columns`).
//! 2. Reject rows without both party addresses.
//! 3. Parse timestamps; in strict mode an unparseable one rejects the row.
//! 4. Parse the byte count with a 0 fallback.
//! 5. Fingerprint `aParty|aPort|bParty|bPort|protocol|startISO|endISO|bytes`.
//!
//! The normalizer is stateless between rows and safe to share across threads.

use std::fmt;

use ipdr_contracts::{
    config::{HashStrategy, TimestampMode},
    evidence::ProcessingContext,
    record::CanonicalRecord,
};
use ipdr_core::{config::ColumnSynonyms, hash::fingerprint};

use crate::{
    columns::{resolve_keyed, Field, HeaderLayout, RawFields, RowView},
    timestamp::{duration_seconds, iso_or_invalid, parse_timestamp},
};

const UNKNOWN_PROTOCOL: &str = "UNKNOWN";

/// Why a row produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingAParty,
    MissingBParty,
    /// Strict mode only.
    InvalidTimestamp,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::MissingAParty => "missing A-party address",
            SkipReason::MissingBParty => "missing B-party address",
            SkipReason::InvalidTimestamp => "unparseable timestamp",
        };
        f.write_str(text)
    }
}

/// Leading-digit integer parse: `"2048.5"` → 2048, anything without a
/// leading digit → 0.
pub fn parse_byte_count(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else { return 0 };
    let raw = raw.trim();
    let raw = raw.strip_prefix('+').unwrap_or(raw);
    let end = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    raw[..end].parse().unwrap_or(0)
}

/// Maps raw rows onto canonical records.
#[derive(Debug, Clone)]
pub struct RowNormalizer {
    columns: ColumnSynonyms,
    row_hash: HashStrategy,
    timestamp_mode: TimestampMode,
}

impl Default for RowNormalizer {
    fn default() -> Self {
        Self::new(ColumnSynonyms::default(), HashStrategy::Cryptographic, TimestampMode::Lenient)
    }
}

impl RowNormalizer {
    pub fn new(columns: ColumnSynonyms, row_hash: HashStrategy, timestamp_mode: TimestampMode) -> Self {
        Self {
            columns,
            row_hash,
            timestamp_mode,
        }
    }

    pub fn columns(&self) -> &ColumnSynonyms {
        &self.columns
    }

    pub fn row_hash(&self) -> HashStrategy {
        self.row_hash
    }

    /// Resolve a delimited header once for all subsequent rows.
    pub fn layout<S: AsRef<str>>(&self, header: &[S]) -> HeaderLayout {
        HeaderLayout::new(header, &self.columns)
    }

    /// Normalize a row addressed by column name (e.g. one JSON object).
    pub fn normalize_keyed<R: RowView + ?Sized>(
        &self,
        row: &R,
        ctx: &ProcessingContext,
        index: u64,
    ) -> Result<CanonicalRecord, SkipReason> {
        self.build(&resolve_keyed(row, &self.columns), ctx, index)
    }

    /// Normalize one split line of a delimited file.
    pub fn normalize_fields<S: AsRef<str>>(
        &self,
        layout: &HeaderLayout,
        row: &[S],
        ctx: &ProcessingContext,
        index: u64,
    ) -> Result<CanonicalRecord, SkipReason> {
        self.build(&layout.resolve(row), ctx, index)
    }

    fn build(
        &self,
        fields: &RawFields<'_>,
        ctx: &ProcessingContext,
        index: u64,
    ) -> Result<CanonicalRecord, SkipReason> {
        let a_party = fields.get(Field::AParty).ok_or(SkipReason::MissingAParty)?;
        let b_party = fields.get(Field::BParty).ok_or(SkipReason::MissingBParty)?;

        let raw_start = fields.get(Field::StartTime);
        let raw_end = fields.get(Field::EndTime);
        let start = raw_start.and_then(parse_timestamp);
        let end = raw_end.and_then(parse_timestamp);

        if self.timestamp_mode == TimestampMode::Strict && (start.is_none() || end.is_none()) {
            return Err(SkipReason::InvalidTimestamp);
        }

        let a_port = fields.get(Field::APort).unwrap_or_default();
        let b_port = fields.get(Field::BPort).unwrap_or_default();
        let protocol = fields
            .get(Field::Protocol)
            .unwrap_or(UNKNOWN_PROTOCOL)
            .to_uppercase();
        let bytes_transferred = parse_byte_count(fields.get(Field::Bytes));

        let canonical = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            a_party,
            a_port,
            b_party,
            b_port,
            protocol,
            iso_or_invalid(start.as_ref()),
            iso_or_invalid(end.as_ref()),
            bytes_transferred
        );

        Ok(CanonicalRecord {
            id: format!("{}_{}", ctx.file_id, index),
            case_id: ctx.case_id.clone(),
            source_file_id: ctx.file_id.clone(),
            a_party: a_party.to_string(),
            a_port: a_port.to_string(),
            b_party: b_party.to_string(),
            b_port: b_port.to_string(),
            protocol,
            duration: duration_seconds(start.as_ref(), end.as_ref()),
            start_timestamp: start,
            end_timestamp: end,
            bytes_transferred,
            operator: ctx.operator,
            raw_row_hash: fingerprint(self.row_hash, &canonical),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_count_parses_like_a_leading_integer() {
        assert_eq!(parse_byte_count(Some("2048")), 2048);
        assert_eq!(parse_byte_count(Some(" 2048.75 ")), 2048);
        assert_eq!(parse_byte_count(Some("+12")), 12);
        assert_eq!(parse_byte_count(Some("1,024")), 1);
        assert_eq!(parse_byte_count(Some("-5")), 0);
        assert_eq!(parse_byte_count(Some("lots")), 0);
        assert_eq!(parse_byte_count(Some("99999999999999999999999")), 0);
        assert_eq!(parse_byte_count(None), 0);
    }

    #[test]
    fn skip_reasons_read_well() {
        assert_eq!(SkipReason::MissingBParty.to_string(), "missing B-party address");
    }
}
