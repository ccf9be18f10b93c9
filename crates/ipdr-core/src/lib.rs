//! # ipdr-core
//!
//! Core traits, shared hashing, configuration, and the ingest pipeline for
//! the IPDR-Intel+ evidence core.
//!
//! This crate provides:
//! - The seams (`EvidenceProcessor`, `AuditSink`, `ProgressObserver`,
//!   `EnvironmentContextProvider`)
//! - SHA-256 / rolling-hash helpers and canonical JSON hashing
//! - TOML configuration (`IpdrConfig`)
//! - The `IngestPipeline` that wires a processor to the custody ledger
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ipdr_core::{IngestPipeline, traits::FileSource};
//!
//! let pipeline = IngestPipeline::new(Box::new(processor), ledger.clone());
//! let processed = pipeline.ingest(source, &ctx, &NoProgress, &CancellationToken::new())?;
//! ```

pub mod cancel;
pub mod config;
pub mod environment;
pub mod hash;
pub mod pipeline;
pub mod traits;

pub use cancel::CancellationToken;
pub use config::{ColumnSynonyms, IngestConfig, IpdrConfig};
pub use pipeline::IngestPipeline;
