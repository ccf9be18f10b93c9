//! The streaming file processor.
//!
//! Per chunk:
//!
//!   read → SHA-256 update → UTF-8 decode → line reassembly → normalize batches → progress
//!
//! The digest is updated with raw bytes as they arrive, so the final value
//! equals a one-shot SHA-256 of the file without ever holding the whole file.
//! Line reassembly is strictly serial; only the normalization of complete
//! lines inside one chunk may fan out to the worker pool, and its results
//! are collected back in source order.

use std::io::{ErrorKind, Read};

use chrono::Utc;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use ipdr_contracts::{
    error::{IpdrError, IpdrResult},
    evidence::{EvidenceFile, ProcessedFile, ProcessingContext},
    record::CanonicalRecord,
};
use ipdr_core::{
    cancel::CancellationToken,
    config::{IngestConfig, IpdrConfig},
    hash::sha256_hex,
    traits::{EvidenceProcessor, FileSource, ProgressObserver},
};
use ipdr_normalize::{
    detect_delimiter, detect_format, parse_json_rows, FileFormat, HeaderLayout, JsonRow,
    LineSplitter, RowNormalizer,
};

use crate::{
    decoder::Utf8ChunkDecoder,
    lines::{split_complete, LineAssembler},
    progress::ProgressTracker,
};

/// Records and skip count produced by one batch of rows.
#[derive(Debug, Default)]
struct BatchOutput {
    records: Vec<CanonicalRecord>,
    skipped: u64,
}

impl BatchOutput {
    fn absorb(&mut self, other: BatchOutput) {
        self.records.extend(other.records);
        self.skipped += other.skipped;
    }
}

/// Header state of a delimited file, fixed by its first line.
struct DelimitedState {
    splitter: LineSplitter,
    layout: HeaderLayout,
}

/// Accumulated state of one delimited stream.
#[derive(Default)]
struct DelimitedRun {
    header: Option<DelimitedState>,
    /// Data lines seen so far; the next line's positional index.
    data_rows: u64,
    output: BatchOutput,
}

impl DelimitedRun {
    fn rows_seen(&self) -> u64 {
        self.output.records.len() as u64 + self.output.skipped
    }
}

/// Chunked, incrementally hashed IPDR file processor.
pub struct StreamingProcessor {
    config: IngestConfig,
    normalizer: RowNormalizer,
    pool: Option<rayon::ThreadPool>,
}

impl StreamingProcessor {
    /// Build a processor from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `IpdrError::Config` for out-of-range settings or if the worker
    /// pool cannot be created.
    pub fn new(config: IpdrConfig) -> IpdrResult<Self> {
        config.validate()?;
        let pool = if config.ingest.max_concurrency > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.ingest.max_concurrency)
                .thread_name(|i| format!("ipdr-normalize-{i}"))
                .build()
                .map_err(|e| IpdrError::Config {
                    reason: format!("failed to build worker pool: {}", e),
                })?;
            Some(pool)
        } else {
            None
        };

        let normalizer = RowNormalizer::new(
            config.columns,
            config.ingest.row_hash,
            config.ingest.timestamp_mode,
        );
        Ok(Self {
            config: config.ingest,
            normalizer,
            pool,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Process an in-memory file in one shot, without chunking.
    ///
    /// Produces the same digest and records as `process` over the same bytes.
    ///
    /// # Errors
    ///
    /// Returns `IpdrError::Parse` for malformed JSON files.
    pub fn process_bytes(
        &self,
        filename: &str,
        bytes: &[u8],
        ctx: &ProcessingContext,
    ) -> IpdrResult<ProcessedFile> {
        let never = CancellationToken::new();
        let output = match detect_format(filename) {
            FileFormat::Json => {
                let rows = parse_json_rows(bytes, filename)?;
                self.normalize_json(&rows, ctx, filename, &never)?
            }
            FileFormat::Delimited => {
                let text = String::from_utf8_lossy(bytes);
                let mut lines = split_complete(&text).into_iter();
                match lines.next() {
                    Some(header) => {
                        let state = self.read_header(&header, filename);
                        let rest: Vec<String> = lines.collect();
                        self.normalize_lines(&state, &rest, 0, ctx, filename, &never)?
                    }
                    None => BatchOutput::default(),
                }
            }
        };

        Ok(self.finish(filename, bytes.len() as u64, sha256_hex(bytes), output, ctx))
    }

    fn read_header(&self, header: &str, filename: &str) -> DelimitedState {
        let splitter = LineSplitter::new(detect_delimiter(header));
        let layout = self.normalizer.layout(&splitter.split(header));
        if !layout.has_parties() {
            warn!(
                filename = %filename,
                "header has no recognised party columns; every row will be skipped"
            );
        }
        debug!(
            filename = %filename,
            delimiter = ?splitter.delimiter(),
            columns = layout.width(),
            "header parsed"
        );
        DelimitedState { splitter, layout }
    }

    fn check_cancel(cancel: &CancellationToken, filename: &str) -> IpdrResult<()> {
        if cancel.is_cancelled() {
            return Err(IpdrError::Cancelled {
                filename: filename.to_string(),
            });
        }
        Ok(())
    }

    /// Normalize delimited lines whose first data-row index is `first_index`.
    fn normalize_lines(
        &self,
        state: &DelimitedState,
        lines: &[String],
        first_index: u64,
        ctx: &ProcessingContext,
        filename: &str,
        cancel: &CancellationToken,
    ) -> IpdrResult<BatchOutput> {
        let run_batch = |batch_no: usize, batch: &[String]| -> IpdrResult<BatchOutput> {
            Self::check_cancel(cancel, filename)?;
            let base = first_index + (batch_no * self.config.batch_size) as u64;
            let mut out = BatchOutput::default();
            let mut parser = state.splitter.parser();
            for (offset, line) in batch.iter().enumerate() {
                let fields = parser.parse(line);
                match self
                    .normalizer
                    .normalize_fields(&state.layout, &fields, ctx, base + offset as u64)
                {
                    Ok(record) => out.records.push(record),
                    Err(_) => out.skipped += 1,
                }
            }
            Ok(out)
        };
        self.run_batches(lines, run_batch)
    }

    fn normalize_json(
        &self,
        rows: &[JsonRow],
        ctx: &ProcessingContext,
        filename: &str,
        cancel: &CancellationToken,
    ) -> IpdrResult<BatchOutput> {
        let run_batch = |batch_no: usize, batch: &[JsonRow]| -> IpdrResult<BatchOutput> {
            Self::check_cancel(cancel, filename)?;
            let base = (batch_no * self.config.batch_size) as u64;
            let mut out = BatchOutput::default();
            for (offset, row) in batch.iter().enumerate() {
                match self.normalizer.normalize_keyed(row, ctx, base + offset as u64) {
                    Ok(record) => out.records.push(record),
                    Err(_) => out.skipped += 1,
                }
            }
            Ok(out)
        };
        self.run_batches(rows, run_batch)
    }

    /// Run `run_batch` over `batch_size` slices of `items`, in order.
    ///
    /// Sequential mode yields the thread between batches. Pool mode fans the
    /// batches out and re-assembles them in source order.
    fn run_batches<T, F>(&self, items: &[T], run_batch: F) -> IpdrResult<BatchOutput>
    where
        T: Sync,
        F: Fn(usize, &[T]) -> IpdrResult<BatchOutput> + Sync,
    {
        let size = self.config.batch_size;
        let mut total = BatchOutput::default();

        match &self.pool {
            Some(pool) => {
                let outputs: Vec<IpdrResult<BatchOutput>> = pool.install(|| {
                    items
                        .par_chunks(size)
                        .enumerate()
                        .map(|(batch_no, batch)| run_batch(batch_no, batch))
                        .collect()
                });
                for output in outputs {
                    total.absorb(output?);
                }
            }
            None => {
                for (batch_no, batch) in items.chunks(size).enumerate() {
                    total.absorb(run_batch(batch_no, batch)?);
                    if self.config.yield_between_batches {
                        std::thread::yield_now();
                    }
                }
            }
        }
        Ok(total)
    }

    fn finish(
        &self,
        filename: &str,
        size: u64,
        sha256: String,
        output: BatchOutput,
        ctx: &ProcessingContext,
    ) -> ProcessedFile {
        ProcessedFile {
            evidence: EvidenceFile {
                id: ctx.file_id.clone(),
                case_id: ctx.case_id.clone(),
                filename: filename.to_string(),
                sha256,
                size,
                operator: ctx.operator,
                storage_uri: ctx.storage_uri(filename),
                uploaded_by: ctx.uploaded_by.clone(),
                uploaded_at: Utc::now(),
                status: None,
                record_count: None,
            },
            records: output.records,
            skipped_rows: output.skipped,
        }
    }

    /// Fill `buf` from `reader`, stopping early only at end of stream.
    fn read_chunk(reader: &mut (dyn Read + Send), buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn stream(
        &self,
        source: FileSource<'_>,
        ctx: &ProcessingContext,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> IpdrResult<ProcessedFile> {
        let filename = source.name.as_str();
        let format = detect_format(filename);
        let mut tracker = ProgressTracker::new(source.size, self.config.chunk_size);
        let mut hasher = Sha256::new();
        let mut decoder = Utf8ChunkDecoder::new();
        let mut assembler = LineAssembler::new();
        let mut run = DelimitedRun::default();
        let mut json_bytes: Vec<u8> = Vec::new();
        let mut buf = vec![0u8; self.config.chunk_size];

        debug!(
            filename = %filename,
            size = source.size,
            chunk_size = self.config.chunk_size,
            format = ?format,
            "streaming started"
        );

        loop {
            Self::check_cancel(cancel, filename)?;

            let n = Self::read_chunk(source.reader, &mut buf)
                .map_err(|e| IpdrError::io(filename, &e))?;
            if n == 0 {
                break;
            }
            let chunk = &buf[..n];
            hasher.update(chunk);

            let rows_before = run.rows_seen();
            match format {
                FileFormat::Json => json_bytes.extend_from_slice(chunk),
                FileFormat::Delimited => {
                    let lines = assembler.push(&decoder.decode(chunk));
                    self.absorb_lines(&mut run, lines, ctx, filename, cancel)?;
                }
            }

            observer.on_progress(&tracker.chunk_done(n, run.rows_seen() - rows_before));
        }

        let output = match format {
            FileFormat::Json => {
                let rows = parse_json_rows(&json_bytes, filename)?;
                let output = self.normalize_json(&rows, ctx, filename, cancel)?;
                observer.on_progress(&tracker.add_rows(rows.len() as u64));
                output
            }
            FileFormat::Delimited => {
                // Held-back decoder bytes never contain a newline, so they
                // belong to the assembler's final line.
                let mut lines = assembler.push(&decoder.finish());
                lines.extend(assembler.finish());
                self.absorb_lines(&mut run, lines, ctx, filename, cancel)?;
                run.output
            }
        };

        let sha256 = hex::encode(hasher.finalize());
        let size = tracker.processed_bytes();

        info!(
            filename = %filename,
            records = output.records.len(),
            skipped = output.skipped,
            bytes = size,
            sha256 = %sha256,
            "streaming finished"
        );

        Ok(self.finish(filename, size, sha256, output, ctx))
    }

    /// Feed complete lines into the run; the first line ever seen is the header.
    fn absorb_lines(
        &self,
        run: &mut DelimitedRun,
        lines: Vec<String>,
        ctx: &ProcessingContext,
        filename: &str,
        cancel: &CancellationToken,
    ) -> IpdrResult<()> {
        let mut lines = lines.into_iter();
        if run.header.is_none() {
            match lines.next() {
                Some(first) => run.header = Some(self.read_header(&first, filename)),
                None => return Ok(()),
            }
        }
        let rest: Vec<String> = lines.collect();
        let Some(state) = run.header.as_ref() else {
            return Ok(());
        };
        if rest.is_empty() {
            return Ok(());
        }

        let batch = self.normalize_lines(state, &rest, run.data_rows, ctx, filename, cancel)?;
        run.data_rows += rest.len() as u64;
        run.output.absorb(batch);
        Ok(())
    }
}

impl EvidenceProcessor for StreamingProcessor {
    fn process(
        &self,
        source: FileSource<'_>,
        ctx: &ProcessingContext,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> IpdrResult<ProcessedFile> {
        let filename = source.name.clone();
        self.stream(source, ctx, observer, cancel).inspect_err(|e| {
            warn!(filename = %filename, error = %e, "file processing aborted");
            observer.on_error(e);
        })
    }
}
