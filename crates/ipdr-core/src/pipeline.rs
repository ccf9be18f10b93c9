//! The ingest pipeline: processes one file and records its custody trail.
//!
//! Lifecycle per file:
//!
//!   upload initiated → process (hash + parse) → parsing completed → evidence created
//!
//! Each arrow that lands on a step appends one ledger entry through the
//! `AuditSink`. If processing fails, nothing after "upload initiated" is
//! written and no records or evidence are handed back.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use ipdr_contracts::{
    audit::{AuditAction, Metadata},
    error::IpdrResult,
    evidence::{EvidenceStatus, ProcessedFile, ProcessingContext},
};

use crate::{
    cancel::CancellationToken,
    traits::{AuditSink, EvidenceProcessor, FileSource, ProgressObserver},
};

/// Drives file processing and records every lifecycle step.
///
/// The audit sink is shared: several pipelines (one per case, or one per
/// concurrent upload) may append to the same ledger.
pub struct IngestPipeline {
    processor: Box<dyn EvidenceProcessor>,
    audit: Arc<dyn AuditSink>,
}

fn metadata(value: serde_json::Value) -> Metadata {
    match value {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => Metadata::new(),
    }
}

impl IngestPipeline {
    pub fn new(processor: Box<dyn EvidenceProcessor>, audit: Arc<dyn AuditSink>) -> Self {
        Self { processor, audit }
    }

    /// Ingest one file.
    ///
    /// # Errors
    ///
    /// Returns any error from the processor (read failure, cancellation,
    /// malformed JSON) and any ledger write failure. On error the caller must
    /// discard the file; nothing partial is returned.
    pub fn ingest(
        &self,
        source: FileSource<'_>,
        ctx: &ProcessingContext,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> IpdrResult<ProcessedFile> {
        let filename = source.name.clone();
        let size = source.size;

        debug!(
            case_id = %ctx.case_id,
            file_id = %ctx.file_id,
            filename = %filename,
            size,
            "ingest starting"
        );

        self.audit.append(
            &ctx.uploaded_by,
            AuditAction::Upload,
            &ctx.file_id,
            metadata(json!({
                "stage": "initiated",
                "filename": filename,
                "size": size,
                "caseId": ctx.case_id,
                "operator": ctx.operator.as_str(),
            })),
        )?;

        let mut processed = match self.processor.process(source, ctx, observer, cancel) {
            Ok(processed) => processed,
            Err(e) => {
                warn!(
                    file_id = %ctx.file_id,
                    filename = %filename,
                    error = %e,
                    "processing aborted, discarding file"
                );
                return Err(e);
            }
        };

        let record_count = processed.records.len() as u64;

        self.audit.append(
            &ctx.uploaded_by,
            AuditAction::Parse,
            &ctx.file_id,
            metadata(json!({
                "stage": "parsing_completed",
                "recordCount": record_count,
                "skippedRows": processed.skipped_rows,
            })),
        )?;

        processed.evidence.status = Some(EvidenceStatus::Completed);
        processed.evidence.record_count = Some(record_count);

        self.audit.append(
            &ctx.uploaded_by,
            AuditAction::Upload,
            &ctx.file_id,
            metadata(json!({
                "stage": "evidence_created",
                "sha256": processed.evidence.sha256,
                "storageUri": processed.evidence.storage_uri,
                "caseId": ctx.case_id,
            })),
        )?;

        info!(
            file_id = %ctx.file_id,
            filename = %filename,
            records = record_count,
            skipped = processed.skipped_rows,
            sha256 = %processed.evidence.sha256,
            "ingest complete"
        );

        Ok(processed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
