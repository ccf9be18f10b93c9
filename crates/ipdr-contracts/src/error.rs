//! Error types for the IPDR ingestion and custody pipeline.
//!
//! All fallible operations return `IpdrResult<T>`. Variants carry enough
//! context to be surfaced to an analyst next to the offending filename.

use thiserror::Error;

/// The unified error type for the ingestion core.
#[derive(Debug, Error)]
pub enum IpdrError {
    /// Reading from the byte source failed. Fatal for the current file.
    #[error("read failed for '{filename}': {reason}")]
    Io { filename: String, reason: String },

    /// The file content could not be interpreted (e.g. malformed JSON).
    #[error("parse error in '{filename}': {reason}")]
    Parse { filename: String, reason: String },

    /// Processing was aborted through a cancellation token.
    #[error("processing of '{filename}' was cancelled")]
    Cancelled { filename: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// The custody ledger could not append an entry.
    ///
    /// Treated as fatal: a lifecycle step that cannot be logged does not proceed.
    #[error("ledger write failed: {reason}")]
    LedgerWrite { reason: String },

    /// A hash chain or export bundle failed integrity checks.
    #[error("integrity violation: {reason}")]
    IntegrityViolation { reason: String },

    /// A value could not be serialized to its canonical form.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

impl IpdrError {
    /// Build an `Io` error from a `std::io::Error` for `filename`.
    pub fn io(filename: &str, err: &std::io::Error) -> Self {
        Self::Io {
            filename: filename.to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for IpdrError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

/// Convenience alias used throughout the IPDR crates.
pub type IpdrResult<T> = Result<T, IpdrError>;
