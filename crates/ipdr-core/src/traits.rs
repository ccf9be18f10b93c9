//! Core trait definitions for the IPDR ingestion pipeline.
//!
//! These traits mark the seams between the pipeline and its collaborators:
//!
//! - `EvidenceProcessor`: turns a byte source into records + evidence
//! - `AuditSink`: trusted, serialized append path of the ledger
//! - `ProgressObserver`: receives progress and error notifications
//! - `EnvironmentContextProvider`: platform context for audit entries
//!
//! The pipeline wires them together in lifecycle order. None of them carry a
//! UI or platform dependency.

use std::io::Read;

use ipdr_contracts::{
    audit::{AuditAction, AuditLogEntry, EntryContext, Metadata},
    certificate::EnvironmentDescription,
    error::{IpdrError, IpdrResult},
    evidence::{ProcessedFile, ProcessingContext},
    progress::ProgressEvent,
};

use crate::cancel::CancellationToken;

/// A file-like byte source: a name, a declared size, and a reader.
///
/// `size` drives progress and ETA reporting only; the processor reads until
/// the reader is exhausted regardless of it.
pub struct FileSource<'a> {
    pub name: String,
    pub size: u64,
    pub reader: &'a mut (dyn Read + Send),
}

impl<'a> FileSource<'a> {
    pub fn new(name: impl Into<String>, size: u64, reader: &'a mut (dyn Read + Send)) -> Self {
        Self {
            name: name.into(),
            size,
            reader,
        }
    }
}

/// Turns one uploaded file into canonical records and evidence metadata.
pub trait EvidenceProcessor: Send + Sync {
    /// Process `source` completely.
    ///
    /// Read failures are reported to `observer.on_error()` and returned as
    /// `IpdrError::Io`; nothing partial is returned. When `cancel` is
    /// triggered no further chunks are read and `IpdrError::Cancelled` is
    /// returned.
    fn process(
        &self,
        source: FileSource<'_>,
        ctx: &ProcessingContext,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> IpdrResult<ProcessedFile>;
}

/// The ledger's append path.
///
/// Implementations must serialize appends: two concurrent calls may never
/// both link to the same previous hash.
pub trait AuditSink: Send + Sync {
    fn append(
        &self,
        actor: &str,
        action: AuditAction,
        subject: &str,
        metadata: Metadata,
    ) -> IpdrResult<AuditLogEntry>;
}

/// Receives progress notifications from a running processor.
pub trait ProgressObserver: Send + Sync {
    /// Called after every chunk.
    fn on_progress(&self, event: &ProgressEvent);

    /// Called once when processing aborts on an error.
    fn on_error(&self, _error: &IpdrError) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// An observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Supplies the platform context recorded alongside audit entries.
///
/// Browser hosts would fill this from the user agent and geolocation; the
/// core only ever sees the resulting plain values.
pub trait EnvironmentContextProvider: Send + Sync {
    /// Context for an entry being appended right now.
    fn capture(&self) -> EntryContext;

    /// Device and software description used in certificates.
    fn describe(&self) -> EnvironmentDescription;
}
