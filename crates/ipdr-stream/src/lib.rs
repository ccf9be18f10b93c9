//! # ipdr-stream
//!
//! Chunked, incrementally hashed streaming processor for IPDR files.
//!
//! `StreamingProcessor` implements `EvidenceProcessor`. It reads a byte
//! source in fixed-size chunks, feeds every chunk into one running SHA-256,
//! reassembles lines across chunk edges, and normalizes them in bounded
//! batches while reporting throughput and ETA after every chunk.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ipdr_stream::StreamingProcessor;
//! use ipdr_core::{config::IpdrConfig, traits::FileSource, CancellationToken};
//!
//! let processor = StreamingProcessor::new(IpdrConfig::default())?;
//! let processed = processor.process(
//!     FileSource::new("jio.csv", size, &mut file),
//!     &ctx,
//!     &|p: &ProgressEvent| println!("{:.0}%", p.fraction() * 100.0),
//!     &CancellationToken::new(),
//! )?;
//! ```

pub mod decoder;
pub mod lines;
pub mod processor;
pub mod progress;

pub use processor::StreamingProcessor;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};
    use std::sync::Mutex;

    use ipdr_contracts::{
        error::IpdrError,
        evidence::{ProcessedFile, ProcessingContext},
        progress::ProgressEvent,
        record::{CanonicalRecord, Operator},
    };
    use ipdr_core::{
        cancel::CancellationToken,
        config::{IpdrConfig, MIN_CHUNK_SIZE},
        hash::sha256_hex,
        traits::{EvidenceProcessor, FileSource, NoProgress, ProgressObserver},
    };

    use super::StreamingProcessor;

    // ── Helpers ───────────────────────────────────────────────────────────────

    const HEADER: &str =
        "SourceIP,SourcePort,DestinationIP,DestinationPort,Protocol,StartTime,EndTime,Bytes";

    fn ctx() -> ProcessingContext {
        ProcessingContext {
            case_id: "case-9".to_string(),
            file_id: "file-9".to_string(),
            operator: Operator::Airtel,
            uploaded_by: "si.verma".to_string(),
        }
    }

    /// A CSV of `rows` data lines with CRLF endings, multi-byte text, and
    /// every 7th row missing its destination.
    fn sample_csv(rows: usize) -> Vec<u8> {
        let mut out = format!("{HEADER}\r\n");
        for i in 0..rows {
            let dest = if i % 7 == 3 { String::new() } else { format!("142.250.{}.{}", i % 250, i % 200) };
            out.push_str(&format!(
                "10.0.{}.{},{},{},443,tcp→{},2025-08-20 10:{:02}:05,2025-08-20 10:{:02}:45,{}\r\n",
                i % 256,
                i % 100,
                5000 + i,
                dest,
                i % 3,
                i % 60,
                i % 60,
                i * 17
            ));
        }
        out.into_bytes()
    }

    fn processor(chunk_size: usize, max_concurrency: usize) -> StreamingProcessor {
        let mut config = IpdrConfig::default();
        config.ingest.chunk_size = chunk_size;
        config.ingest.batch_size = 97;
        config.ingest.max_concurrency = max_concurrency;
        StreamingProcessor::new(config).unwrap()
    }

    fn stream(p: &StreamingProcessor, name: &str, bytes: &[u8]) -> ProcessedFile {
        let mut reader = Cursor::new(bytes.to_vec());
        p.process(
            FileSource::new(name, bytes.len() as u64, &mut reader),
            &ctx(),
            &NoProgress,
            &CancellationToken::new(),
        )
        .unwrap()
    }

    fn sorted(mut records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Hands out at most `step` bytes per read, then fails after `fail_after`.
    struct FlakyReader {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        fail_after: Option<usize>,
    }

    impl Read for FlakyReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if let Some(limit) = self.fail_after {
                if self.pos >= limit {
                    return Err(std::io::Error::other("usb drive removed"));
                }
            }
            let n = buf.len().min(self.step).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    /// Observer that keeps every event and error message.
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<ProgressEvent>>,
        errors: Mutex<Vec<String>>,
    }

    impl ProgressObserver for Recorder {
        fn on_progress(&self, event: &ProgressEvent) {
            self.events.lock().unwrap().push(event.clone());
        }

        fn on_error(&self, error: &IpdrError) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    /// Streaming and one-shot processing agree for any chunk size.
    #[test]
    fn test_streaming_matches_single_shot() {
        let bytes = sample_csv(3_000);
        assert!(bytes.len() > 4 * MIN_CHUNK_SIZE, "sample must span many chunks");

        let reference = processor(MIN_CHUNK_SIZE, 1)
            .process_bytes("airtel.csv", &bytes, &ctx())
            .unwrap();
        assert_eq!(reference.evidence.sha256, sha256_hex(&bytes));

        for chunk_size in [MIN_CHUNK_SIZE, MIN_CHUNK_SIZE + 1, 50_021, 1 << 20] {
            let streamed = stream(&processor(chunk_size, 1), "airtel.csv", &bytes);
            assert_eq!(
                streamed.evidence.sha256, reference.evidence.sha256,
                "digest differs at chunk size {chunk_size}"
            );
            assert_eq!(streamed.skipped_rows, reference.skipped_rows);
            assert_eq!(
                sorted(streamed.records),
                sorted(reference.records.clone()),
                "records differ at chunk size {chunk_size}"
            );
        }
    }

    /// Rows missing a destination are counted, not returned.
    #[test]
    fn test_skip_count_and_record_order() {
        let bytes = sample_csv(700);
        let processed = stream(&processor(MIN_CHUNK_SIZE, 1), "jio.csv", &bytes);

        assert_eq!(processed.skipped_rows, 100);
        assert_eq!(processed.records.len(), 600);
        assert_eq!(processed.evidence.size, bytes.len() as u64);
        assert_eq!(processed.records[0].id, "file-9_0");
        assert_eq!(processed.records[3].id, "file-9_4", "row 3 was dropped");
        assert_eq!(processed.records[0].protocol, "TCP→0");
        assert_eq!(processed.records[0].duration, 40);
        assert!(processed.records.windows(2).all(|w| w[0].id != w[1].id));
    }

    /// The worker pool yields the same records in the same order.
    #[test]
    fn test_parallel_normalization_preserves_order() {
        let bytes = sample_csv(2_500);
        let serial = stream(&processor(MIN_CHUNK_SIZE + 7, 1), "vi.csv", &bytes);
        let parallel = stream(&processor(MIN_CHUNK_SIZE + 7, 4), "vi.csv", &bytes);

        assert_eq!(parallel.evidence.sha256, serial.evidence.sha256);
        assert_eq!(parallel.records, serial.records, "order must survive fan-out");
    }

    /// Short reads from the source do not change the outcome.
    #[test]
    fn test_short_reads_fill_chunks() {
        let bytes = sample_csv(400);
        let p = processor(MIN_CHUNK_SIZE, 1);
        let mut reader = FlakyReader { data: bytes.clone(), pos: 0, step: 333, fail_after: None };
        let processed = p
            .process(
                FileSource::new("jio.csv", bytes.len() as u64, &mut reader),
                &ctx(),
                &NoProgress,
                &CancellationToken::new(),
            )
            .unwrap();
        let reference = p.process_bytes("jio.csv", &bytes, &ctx()).unwrap();
        assert_eq!(processed.evidence.sha256, reference.evidence.sha256);
        assert_eq!(processed.records, reference.records);
    }

    /// One progress event per chunk, ending at 100%.
    #[test]
    fn test_progress_events_per_chunk() {
        let bytes = sample_csv(1_000);
        let p = processor(MIN_CHUNK_SIZE, 1);
        let recorder = Recorder::default();
        let mut reader = Cursor::new(bytes.clone());
        let processed = p
            .process(
                FileSource::new("jio.csv", bytes.len() as u64, &mut reader),
                &ctx(),
                &recorder,
                &CancellationToken::new(),
            )
            .unwrap();

        let events = recorder.events.lock().unwrap();
        let expected_chunks = bytes.len().div_ceil(MIN_CHUNK_SIZE) as u64;
        assert_eq!(events.len() as u64, expected_chunks);

        let last = events.last().unwrap();
        assert_eq!(last.current_chunk, expected_chunks);
        assert_eq!(last.total_chunks, expected_chunks);
        assert_eq!(last.processed_bytes, bytes.len() as u64);
        assert_eq!(last.estimated_time_remaining_ms, 0);
        assert!(events.windows(2).all(|w| w[0].processed_bytes < w[1].processed_bytes));

        // The final unterminated line is counted only after the stream ends.
        let counted = last.processed_rows;
        let total = processed.records.len() as u64 + processed.skipped_rows;
        assert!(counted <= total);
        assert!(total - counted <= 1);
    }

    /// JSON exports go through the same hashing path.
    #[test]
    fn test_json_file_streams_and_parses() {
        let doc = r#"{"ipdr_records":[
            {"A_Party":"10.1.1.1","B_Party":"8.8.8.8","Protocol":"udp","Bytes":512,
             "StartTime":"2025-08-20T10:00:00Z","EndTime":"2025-08-20T10:01:00Z"},
            {"A_Party":"10.1.1.2","B_Party":""},
            {"SrcIP":"10.1.1.3","DstIP":"1.1.1.1"}
        ]}"#;
        let processed = stream(&processor(MIN_CHUNK_SIZE, 1), "export.json", doc.as_bytes());

        assert_eq!(processed.evidence.sha256, sha256_hex(doc));
        assert_eq!(processed.records.len(), 2);
        assert_eq!(processed.skipped_rows, 1);
        assert_eq!(processed.records[0].duration, 60);
        assert_eq!(processed.records[0].bytes_transferred, 512);
        assert_eq!(processed.records[1].protocol, "UNKNOWN");
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let p = processor(MIN_CHUNK_SIZE, 1);
        let mut reader = Cursor::new(b"[{\"A_Party\":".to_vec());
        let err = p
            .process(
                FileSource::new("broken.json", 12, &mut reader),
                &ctx(),
                &NoProgress,
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, IpdrError::Parse { .. }));
    }

    /// A read failure aborts the file and reaches the error hook.
    #[test]
    fn test_read_error_aborts_processing() {
        let bytes = sample_csv(1_000);
        let p = processor(MIN_CHUNK_SIZE, 1);
        let recorder = Recorder::default();
        let mut reader = FlakyReader {
            data: bytes.clone(),
            pos: 0,
            step: 4096,
            fail_after: Some(MIN_CHUNK_SIZE * 2),
        };

        let err = p
            .process(
                FileSource::new("jio.csv", bytes.len() as u64, &mut reader),
                &ctx(),
                &recorder,
                &CancellationToken::new(),
            )
            .unwrap_err();

        match &err {
            IpdrError::Io { filename, reason } => {
                assert_eq!(filename, "jio.csv");
                assert!(reason.contains("usb drive removed"));
            }
            other => panic!("expected Io, got {:?}", other),
        }
        let errors = recorder.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("jio.csv"));
    }

    /// Cancelling from the progress callback stops before the next chunk.
    #[test]
    fn test_cancellation_stops_reading() {
        let bytes = sample_csv(2_000);
        let p = processor(MIN_CHUNK_SIZE, 1);
        let token = CancellationToken::new();
        let trigger = token.clone();
        let seen = Mutex::new(0u64);
        let observer = |event: &ProgressEvent| {
            *seen.lock().unwrap() = event.current_chunk;
            trigger.cancel();
        };

        let mut reader = Cursor::new(bytes.clone());
        let err = p
            .process(
                FileSource::new("big.csv", bytes.len() as u64, &mut reader),
                &ctx(),
                &observer,
                &token,
            )
            .unwrap_err();

        assert!(matches!(err, IpdrError::Cancelled { .. }), "got {:?}", err);
        assert_eq!(*seen.lock().unwrap(), 1, "no chunk may be read after cancel");
    }

    #[test]
    fn test_empty_and_header_only_files() {
        let p = processor(MIN_CHUNK_SIZE, 1);
        let empty = stream(&p, "empty.csv", b"");
        assert!(empty.records.is_empty());
        assert_eq!(empty.evidence.sha256, sha256_hex(""));

        let header_only = stream(&p, "header.csv", HEADER.as_bytes());
        assert!(header_only.records.is_empty());
        assert_eq!(header_only.skipped_rows, 0);
    }

    #[test]
    fn test_unterminated_last_line_is_flushed() {
        let body = format!(
            "{HEADER}\n10.0.0.1,1,10.0.0.2,2,udp,2025-08-20 10:00:00,2025-08-20 10:00:01,5"
        );
        let processed = stream(&processor(MIN_CHUNK_SIZE, 1), "tail.csv", body.as_bytes());
        assert_eq!(processed.records.len(), 1);
        assert_eq!(processed.records[0].bytes_transferred, 5);
    }

    #[test]
    fn test_invalid_chunk_size_is_rejected() {
        let mut config = IpdrConfig::default();
        config.ingest.chunk_size = 1;
        assert!(StreamingProcessor::new(config).is_err());
    }
}
