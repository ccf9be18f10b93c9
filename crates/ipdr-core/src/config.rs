//! TOML configuration for ingestion.
//!
//! Every field has a default, so an empty document is a valid configuration.
//!
//! Example:
//! ```toml
//! [ingest]
//! chunk_size = 4194304
//! batch_size = 1000
//! max_concurrency = 4
//! row_hash = "fast-rolling"
//! timestamp_mode = "strict"
//!
//! [columns]
//! a_party = ["MSISDN_IP", "SourceIP"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use ipdr_contracts::{
    config::{HashStrategy, TimestampMode},
    error::{IpdrError, IpdrResult},
};

pub const MIN_CHUNK_SIZE: usize = 16 * 1024;
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Streaming processor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Bytes read per chunk.
    pub chunk_size: usize,
    /// Lines normalized between yield points.
    pub batch_size: usize,
    /// Upper bound on worker threads normalizing the batches of one chunk.
    /// `1` keeps everything on the calling thread.
    pub max_concurrency: usize,
    /// Fingerprint strategy for `raw_row_hash`.
    pub row_hash: HashStrategy,
    pub timestamp_mode: TimestampMode,
    /// Yield the thread between batches so a host event loop can run.
    pub yield_between_batches: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: 1,
            row_hash: HashStrategy::Cryptographic,
            timestamp_mode: TimestampMode::Lenient,
            yield_between_batches: true,
        }
    }
}

impl IngestConfig {
    /// Check the numeric bounds.
    ///
    /// # Errors
    ///
    /// Returns `IpdrError::Config` naming the first out-of-range field.
    pub fn validate(&self) -> IpdrResult<()> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(IpdrError::Config {
                reason: format!(
                    "chunk_size {} outside {}..={}",
                    self.chunk_size, MIN_CHUNK_SIZE, MAX_CHUNK_SIZE
                ),
            });
        }
        if self.batch_size == 0 {
            return Err(IpdrError::Config {
                reason: "batch_size must be at least 1".to_string(),
            });
        }
        if self.max_concurrency == 0 {
            return Err(IpdrError::Config {
                reason: "max_concurrency must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Accepted header spellings per logical field, in priority order.
///
/// A field listed in TOML replaces the default list for that field only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSynonyms {
    pub a_party: Vec<String>,
    pub a_port: Vec<String>,
    pub b_party: Vec<String>,
    pub b_port: Vec<String>,
    pub protocol: Vec<String>,
    pub start_time: Vec<String>,
    pub end_time: Vec<String>,
    pub bytes: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnSynonyms {
    fn default() -> Self {
        Self {
            a_party: names(&[
                "SourceIP", "SrcIP", "src_ip", "source_ip", "Source IP", "A_Party", "aParty",
                "A Party",
            ]),
            a_port: names(&[
                "SourcePort", "SrcPort", "src_port", "source_port", "Source Port", "A_Port",
                "aPort",
            ]),
            b_party: names(&[
                "DestinationIP", "DestIP", "DstIP", "dst_ip", "dest_ip", "destination_ip",
                "Destination IP", "B_Party", "bParty", "B Party",
            ]),
            b_port: names(&[
                "DestinationPort", "DestPort", "DstPort", "dst_port", "dest_port",
                "destination_port", "Destination Port", "B_Port", "bPort",
            ]),
            protocol: names(&["Protocol", "protocol", "Proto", "proto", "PROTOCOL"]),
            start_time: names(&[
                "StartTime", "start_time", "Start Time", "SessionStart", "session_start",
                "startTimestamp", "Timestamp", "timestamp",
            ]),
            end_time: names(&[
                "EndTime", "end_time", "End Time", "SessionEnd", "session_end", "endTimestamp",
            ]),
            bytes: names(&[
                "Bytes", "bytes", "BytesTransferred", "bytes_transferred", "bytesTransferred",
                "TotalBytes", "total_bytes", "DataVolume", "data_volume",
            ]),
        }
    }
}

impl ColumnSynonyms {
    fn validate(&self) -> IpdrResult<()> {
        let fields = [
            ("a_party", &self.a_party),
            ("a_port", &self.a_port),
            ("b_party", &self.b_party),
            ("b_port", &self.b_port),
            ("protocol", &self.protocol),
            ("start_time", &self.start_time),
            ("end_time", &self.end_time),
            ("bytes", &self.bytes),
        ];
        for (field, list) in fields {
            if list.is_empty() {
                return Err(IpdrError::Config {
                    reason: format!("column list '{field}' must not be empty"),
                });
            }
        }
        Ok(())
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpdrConfig {
    pub ingest: IngestConfig,
    pub columns: ColumnSynonyms,
}

impl IpdrConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `IpdrError::Config` if the TOML is malformed, does not match
    /// the schema, or holds out-of-range values.
    pub fn from_toml_str(s: &str) -> IpdrResult<Self> {
        let config: IpdrConfig = toml::from_str(s).map_err(|e| IpdrError::Config {
            reason: format!("failed to parse configuration TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `IpdrError::Config` if the file cannot be read or fails
    /// `from_toml_str`.
    pub fn from_file(path: &Path) -> IpdrResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| IpdrError::Config {
            reason: format!("failed to read configuration file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> IpdrResult<()> {
        self.ingest.validate()?;
        self.columns.validate()
    }
}
