//! # ipdr-normalize
//!
//! Format detection and row normalization for telecom IPDR files.
//!
//! ## Overview
//!
//! Every operator exports IPDR logs with its own header spellings. This
//! crate detects the file format and delimiter, resolves each logical field
//! from an ordered synonym list (first non-empty match wins), and builds a
//! `CanonicalRecord` with a row fingerprint. Rows missing a party address
//! are dropped and reported as a `SkipReason`.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use ipdr_normalize::{detect_delimiter, LineSplitter, RowNormalizer};
//!
//! let normalizer = RowNormalizer::default();
//! let splitter = LineSplitter::new(detect_delimiter(header_line));
//! let layout = normalizer.layout(&splitter.split(header_line));
//! let record = normalizer.normalize_fields(&layout, &splitter.split(line), &ctx, 0)?;
//! ```

pub mod columns;
pub mod delimited;
pub mod detector;
pub mod json;
pub mod normalizer;
pub mod timestamp;

pub use columns::{Field, HeaderLayout, RowView};
pub use delimited::{FieldParser, LineSplitter};
pub use detector::{detect_delimiter, detect_format, Delimiter, FileFormat};
pub use json::{parse_json_rows, rows_from_value, JsonRow};
pub use normalizer::{parse_byte_count, RowNormalizer, SkipReason};

// ── Tests ─────────────────────────────────────────────────────────────────────
