//! IPDR-Intel+ command-line front end.
//!
//! Ingests one operator IPDR export through the streaming processor and the
//! chain-of-custody ledger, and re-verifies exported ledgers and
//! certificates offline.
//!
//! Usage:
//!   ipdr-intel ingest jio_aug.csv --case FIR-112/2025 --operator jio --actor si.verma --out-dir out/
//!   ipdr-intel ingest airtel.tsv --case FIR-112/2025 --ledger out/ledger_export.json --out-dir out/
//!   ipdr-intel verify out/ledger_export.json
//!   ipdr-intel verify --certificate out/certificate.json

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ipdr_contracts::{
    audit::{LedgerExport, VerificationResult},
    certificate::{BsaCertificate, ExpertAttestation},
    config::{HashStrategy, TimestampMode},
    error::{IpdrError, IpdrResult},
    evidence::ProcessingContext,
    progress::ProgressEvent,
    record::Operator,
};
use ipdr_core::{
    environment::ServerEnvironment,
    hash::sha256_reader,
    traits::{FileSource, ProgressObserver},
    CancellationToken, IngestPipeline, IpdrConfig,
};
use ipdr_custody::{
    generate_certificate, verification_script, verify_certificate, verify_export, CustodyLedger,
};
use ipdr_stream::StreamingProcessor;

// ── CLI definition ────────────────────────────────────────────────────────────

/// IPDR-Intel+: evidence-grade ingestion of operator IPDR exports.
#[derive(Parser)]
#[command(
    name = "ipdr-intel",
    version,
    about = "Evidence-grade IPDR ingestion with a hash-chained custody ledger",
    long_about = "Streams operator IPDR exports (CSV/TSV/JSON) into canonical records,\n\
                  computes an incremental SHA-256 of the evidence, and records every\n\
                  step in a tamper-evident chain-of-custody ledger."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one IPDR file and record its custody.
    Ingest(IngestArgs),
    /// Re-verify an exported ledger bundle or a certificate.
    Verify(VerifyArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// IPDR file to ingest (.csv, .tsv, .txt, or .json).
    file: PathBuf,

    /// Case the evidence belongs to.
    #[arg(long)]
    case: String,

    /// Operator that produced the export (jio, airtel, vi, bsnl).
    #[arg(long, default_value = "unknown")]
    operator: String,

    /// Investigator recorded as the uploader.
    #[arg(long, default_value = "analyst")]
    actor: String,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Continue an existing ledger from its export bundle.
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Directory for records, ledger export, verifier script, and certificate.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Override the configured chunk size in bytes.
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Override the configured number of normalization workers.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Fingerprint rows with the fast rolling hash instead of SHA-256.
    #[arg(long)]
    fast_hash: bool,

    /// Drop rows whose timestamps cannot be parsed.
    #[arg(long)]
    strict_timestamps: bool,

    /// Suppress the progress line.
    #[arg(long, short)]
    quiet: bool,

    #[command(flatten)]
    expert: ExpertArgs,
}

/// Expert attestation; a certificate is issued only when a name is given.
#[derive(Args)]
struct ExpertArgs {
    #[arg(long = "expert-name")]
    name: Option<String>,
    #[arg(long = "expert-designation", default_value = "Examiner of Electronic Evidence")]
    designation: String,
    #[arg(long = "expert-credentials", default_value = "")]
    credentials: String,
    #[arg(long = "expert-organization", default_value = "")]
    organization: String,
}

#[derive(Args)]
struct VerifyArgs {
    /// Ledger export bundle (or certificate, with --certificate).
    path: PathBuf,

    /// Treat the file as a certificate instead of a ledger export.
    #[arg(long)]
    certificate: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for per-entry ledger output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Ingest(args) => ingest(args).map(|()| true),
        Command::Verify(args) => verify(&args),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("ipdr-intel: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Ingest ────────────────────────────────────────────────────────────────────

fn load_config(args: &IngestArgs) -> IpdrResult<IpdrConfig> {
    let mut config = match &args.config {
        Some(path) => IpdrConfig::from_file(path)?,
        None => IpdrConfig::default(),
    };
    if let Some(chunk_size) = args.chunk_size {
        config.ingest.chunk_size = chunk_size;
    }
    if let Some(concurrency) = args.concurrency {
        config.ingest.max_concurrency = concurrency;
    }
    if args.fast_hash {
        config.ingest.row_hash = HashStrategy::FastRolling;
    }
    if args.strict_timestamps {
        config.ingest.timestamp_mode = TimestampMode::Strict;
    }
    config.validate()?;
    Ok(config)
}

fn open_ledger(path: Option<&Path>) -> IpdrResult<Arc<CustodyLedger>> {
    let environment = Arc::new(ServerEnvironment);
    let ledger = match path {
        Some(path) if path.exists() => {
            let export: LedgerExport = read_json(path)?;
            CustodyLedger::from_export(export, environment)?
        }
        _ => CustodyLedger::new(environment)?,
    };
    Ok(Arc::new(ledger))
}

/// Byte-based progress bar on stderr, fed by per-chunk progress events.
struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    fn new(quiet: bool, total_bytes: u64) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total_bytes)
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.set_message("streaming");
        Self { bar }
    }

    fn finish(&self, rows: usize) {
        self.bar.finish_with_message(format!("{} rows normalized", rows));
    }
}

fn progress_message(event: &ProgressEvent) -> String {
    format!(
        "chunk {}/{}  {} rows  {:.1} MB/s  ETA {:.1}s",
        event.current_chunk,
        event.total_chunks,
        event.processed_rows,
        event.throughput_mbps,
        event.estimated_time_remaining_ms as f64 / 1000.0,
    )
}

impl ProgressObserver for ProgressDisplay {
    fn on_progress(&self, event: &ProgressEvent) {
        self.bar.set_length(event.total_bytes);
        self.bar.set_position(event.processed_bytes);
        self.bar.set_message(progress_message(event));
    }

    fn on_error(&self, error: &IpdrError) {
        self.bar.abandon_with_message(format!("aborted: {}", error));
    }
}

fn ingest(args: IngestArgs) -> IpdrResult<()> {
    let config = load_config(&args)?;
    let ledger = open_ledger(args.ledger.as_deref())?;

    let filename = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());
    let display = args.file.display().to_string();
    let mut file = File::open(&args.file).map_err(|e| IpdrError::io(&display, &e))?;
    let size = file
        .metadata()
        .map_err(|e| IpdrError::io(&display, &e))?
        .len();

    let operator = args.operator.parse().unwrap_or(Operator::Unknown);
    let ctx = ProcessingContext::new(args.case.clone(), operator, args.actor.clone());

    let processor = StreamingProcessor::new(config)?;
    let pipeline = IngestPipeline::new(Box::new(processor), ledger.clone());
    let progress = ProgressDisplay::new(args.quiet, size);

    let processed = pipeline.ingest(
        FileSource::new(filename, size, &mut file),
        &ctx,
        &progress,
        &CancellationToken::new(),
    )?;
    progress.finish(processed.records.len());

    let evidence = &processed.evidence;
    println!();
    println!("=== Evidence ingested ===");
    println!();
    println!("  File:            {}", evidence.filename);
    println!("  Evidence id:     {}", evidence.id);
    println!("  Case:            {}", evidence.case_id);
    println!("  Operator:        {}", evidence.operator);
    println!("  Size:            {} bytes", evidence.size);
    println!("  SHA-256:         {}", evidence.sha256);
    println!("  Records:         {}", processed.records.len());
    println!("  Skipped rows:    {}", processed.skipped_rows);
    println!("  Storage URI:     {}", evidence.storage_uri);

    let certificate = match &args.expert.name {
        Some(name) => {
            let expert = ExpertAttestation {
                name: name.clone(),
                designation: args.expert.designation.clone(),
                credentials: args.expert.credentials.clone(),
                organization: args.expert.organization.clone(),
            };
            let current = sha256_file(&args.file)?;
            let certificate = generate_certificate(&ledger, evidence, Some(&current), expert)?;
            println!("  Certificate:     {}", certificate.body.certificate_id);
            Some(certificate)
        }
        None => None,
    };

    let verification = ledger.verify();
    println!("  Ledger entries:  {}", ledger.len());
    println!("  Ledger head:     {}", ledger.head_hash());
    println!(
        "  Ledger status:   {}",
        if verification.is_valid { "VALID" } else { "BROKEN" }
    );
    println!();

    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir).map_err(|e| IpdrError::io(&dir.display().to_string(), &e))?;

        write_json(&dir.join("records.json"), &processed.records)?;
        write_json(&dir.join("ledger_export.json"), &ledger.export()?)?;
        write_text(&dir.join("verify_ledger.py"), verification_script())?;
        if let Some(certificate) = &certificate {
            write_json(&dir.join("certificate.json"), certificate)?;
        }
        println!("  Output written to {}", dir.display());
        println!();
    }

    Ok(())
}

// ── Verify ────────────────────────────────────────────────────────────────────

fn verify(args: &VerifyArgs) -> IpdrResult<bool> {
    let result = if args.certificate {
        let certificate: BsaCertificate = read_json(&args.path)?;
        println!("=== Certificate {} ===", certificate.body.certificate_id);
        verify_certificate(&certificate)
    } else {
        let export: LedgerExport = read_json(&args.path)?;
        println!(
            "=== Ledger export: {} entries, head {} ===",
            export.audit_log.len(),
            export.head_hash
        );
        verify_export(&export)
    };
    print_verification(&result);
    Ok(result.is_valid)
}

fn print_verification(result: &VerificationResult) {
    println!();
    if result.is_valid {
        println!("  Result: VALID");
    } else {
        println!("  Result: INVALID ({} discrepancies)", result.errors.len());
        for error in &result.errors {
            println!("    - {}", error);
        }
    }
    println!();
}

// ── File helpers ──────────────────────────────────────────────────────────────

fn read_json<T: DeserializeOwned>(path: &Path) -> IpdrResult<T> {
    let display = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|e| IpdrError::io(&display, &e))?;
    serde_json::from_str(&text).map_err(|e| IpdrError::Parse {
        filename: display,
        reason: e.to_string(),
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> IpdrResult<()> {
    let display = path.display().to_string();
    let file = File::create(path).map_err(|e| IpdrError::io(&display, &e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(|e| IpdrError::io(&display, &e))?;
    info!(path = %path.display(), "wrote");
    Ok(())
}

/// Digest of the file as it exists on disk now, for the certificate.
fn sha256_file(path: &Path) -> IpdrResult<String> {
    let display = path.display().to_string();
    let mut file = File::open(path).map_err(|e| IpdrError::io(&display, &e))?;
    sha256_reader(&mut file).map_err(|e| IpdrError::io(&display, &e))
}

fn write_text(path: &Path, text: &str) -> IpdrResult<()> {
    let display = path.display().to_string();
    fs::write(path, text).map_err(|e| IpdrError::io(&display, &e))?;
    info!(path = %path.display(), "wrote");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(processed_bytes: u64) -> ProgressEvent {
        ProgressEvent {
            processed_bytes,
            total_bytes: 4096,
            processed_rows: 120,
            estimated_time_remaining_ms: 2500,
            current_chunk: 2,
            total_chunks: 4,
            throughput_mbps: 3.4,
        }
    }

    #[test]
    fn progress_tracks_bytes_and_describes_chunk() {
        let progress = ProgressDisplay::new(true, 0);
        progress.on_progress(&event(2048));

        assert_eq!(progress.bar.length(), Some(4096));
        assert_eq!(progress.bar.position(), 2048);
        assert_eq!(
            progress.bar.message(),
            "chunk 2/4  120 rows  3.4 MB/s  ETA 2.5s"
        );
        assert!(!progress.bar.is_finished());
    }

    #[test]
    fn progress_is_abandoned_on_error() {
        let progress = ProgressDisplay::new(true, 4096);
        progress.on_progress(&event(1024));
        progress.on_error(&IpdrError::Cancelled {
            filename: "jio.csv".to_string(),
        });

        assert!(progress.bar.is_finished());
        assert_eq!(progress.bar.position(), 1024);
        assert!(progress.bar.message().starts_with("aborted: "));
    }

    #[test]
    fn certificate_digest_is_read_from_disk() {
        let path = std::env::temp_dir().join(format!("ipdr-cli-{}.csv", std::process::id()));
        fs::write(&path, b"SourceIP,DestIP\n10.0.0.1,8.8.8.8\n").unwrap();

        let digest = sha256_file(&path).unwrap();
        assert_eq!(
            digest,
            ipdr_core::hash::sha256_hex(b"SourceIP,DestIP\n10.0.0.1,8.8.8.8\n")
        );

        fs::write(&path, b"SourceIP,DestIP\n10.0.0.2,8.8.8.8\n").unwrap();
        assert_ne!(sha256_file(&path).unwrap(), digest);
        let _ = fs::remove_file(&path);
    }
}
