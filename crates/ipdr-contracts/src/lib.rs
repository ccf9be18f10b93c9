//! # ipdr-contracts
//!
//! Shared types, data contracts, and errors for the IPDR-Intel+ ingestion
//! and chain-of-custody core.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions and error types.

pub mod audit;
pub mod certificate;
pub mod config;
pub mod error;
pub mod evidence;
pub mod progress;
pub mod record;
