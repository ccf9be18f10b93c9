//! # ipdr-custody
//!
//! Append-only, SHA-256 hash-chained chain-of-custody ledger for IPDR
//! evidence, with export/restore and Section 63 BSA certificates.
//!
//! ## Overview
//!
//! Every action on a piece of evidence becomes an `AuditLogEntry` whose
//! `current_hash` commits to its own fields and to the previous entry's
//! hash. Editing any entry, even one byte of its metadata, breaks the chain
//! and is reported by `verify_chain` with the entry's index.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ipdr_core::environment::ServerEnvironment;
//! use ipdr_custody::{generate_certificate, CustodyLedger};
//!
//! let ledger = Arc::new(CustodyLedger::new(Arc::new(ServerEnvironment))?);
//! ledger.add_entry("si.verma", AuditAction::View, &evidence.id, Metadata::new(), None)?;
//!
//! assert!(ledger.verify().is_valid);
//! let export = ledger.export()?;
//! let certificate = generate_certificate(&ledger, &evidence, None, expert)?;
//! ```

pub mod certificate;
pub mod chain;
pub mod export;
pub mod ledger;

pub use certificate::{generate_certificate, verify_certificate};
pub use chain::{hash_entry, verify_chain, GENESIS_PREVIOUS_HASH, GENESIS_SUBJECT};
pub use export::{verification_script, verify_export};
pub use ledger::CustodyLedger;

// ── Tests ─────────────────────────────────────────────────────────────────────
