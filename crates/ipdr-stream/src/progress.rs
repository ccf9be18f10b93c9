//! Throughput and ETA bookkeeping for progress events.

use std::time::{Duration, Instant};

use ipdr_contracts::progress::ProgressEvent;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Weight of the newest sample in the throughput moving average.
const SMOOTHING: f64 = 0.3;

#[derive(Debug)]
pub struct ProgressTracker {
    total_bytes: u64,
    chunk_size: u64,
    started: Instant,
    last_tick: Instant,
    processed_bytes: u64,
    processed_rows: u64,
    current_chunk: u64,
    throughput_mbps: Option<f64>,
}

/// ETA by extrapolating elapsed time over the remaining byte ratio.
pub fn estimate_remaining(elapsed: Duration, processed: u64, total: u64) -> Duration {
    if processed == 0 || processed >= total {
        return Duration::ZERO;
    }
    let projected = elapsed.as_secs_f64() * (total as f64 / processed as f64);
    Duration::from_secs_f64((projected - elapsed.as_secs_f64()).max(0.0))
}

impl ProgressTracker {
    pub fn new(total_bytes: u64, chunk_size: usize) -> Self {
        let now = Instant::now();
        Self {
            total_bytes,
            chunk_size: chunk_size.max(1) as u64,
            started: now,
            last_tick: now,
            processed_bytes: 0,
            processed_rows: 0,
            current_chunk: 0,
            throughput_mbps: None,
        }
    }

    fn total_chunks(&self) -> u64 {
        self.total_bytes
            .div_ceil(self.chunk_size)
            .max(self.current_chunk)
    }

    /// Record one processed chunk and build the event for it.
    pub fn chunk_done(&mut self, bytes: usize, rows: u64) -> ProgressEvent {
        let now = Instant::now();
        let tick = now.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;

        self.processed_bytes += bytes as u64;
        self.processed_rows += rows;
        self.current_chunk += 1;

        if tick > 0.0 {
            let sample = bytes as f64 / BYTES_PER_MB / tick;
            self.throughput_mbps = Some(match self.throughput_mbps {
                Some(previous) => SMOOTHING * sample + (1.0 - SMOOTHING) * previous,
                None => sample,
            });
        }

        self.snapshot()
    }

    /// Add rows that were produced after the last chunk (e.g. JSON parsing).
    pub fn add_rows(&mut self, rows: u64) -> ProgressEvent {
        self.processed_rows += rows;
        self.snapshot()
    }

    pub fn processed_bytes(&self) -> u64 {
        self.processed_bytes
    }

    fn snapshot(&self) -> ProgressEvent {
        let total_bytes = self.total_bytes.max(self.processed_bytes);
        let eta = estimate_remaining(self.started.elapsed(), self.processed_bytes, total_bytes);
        ProgressEvent {
            processed_bytes: self.processed_bytes,
            total_bytes,
            processed_rows: self.processed_rows,
            estimated_time_remaining_ms: u64::try_from(eta.as_millis()).unwrap_or(u64::MAX),
            current_chunk: self.current_chunk,
            total_chunks: self.total_chunks(),
            throughput_mbps: self.throughput_mbps.unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_extrapolates_remaining_share() {
        let eta = estimate_remaining(Duration::from_secs(10), 25, 100);
        assert_eq!(eta.as_secs(), 30);
        assert_eq!(estimate_remaining(Duration::from_secs(10), 0, 100), Duration::ZERO);
        assert_eq!(estimate_remaining(Duration::from_secs(10), 100, 100), Duration::ZERO);
    }

    #[test]
    fn chunk_counters_advance() {
        let mut tracker = ProgressTracker::new(250, 100);
        let first = tracker.chunk_done(100, 4);
        assert_eq!(first.current_chunk, 1);
        assert_eq!(first.total_chunks, 3);
        assert_eq!(first.processed_rows, 4);

        tracker.chunk_done(100, 5);
        let last = tracker.chunk_done(50, 1);
        assert_eq!(last.processed_bytes, 250);
        assert_eq!(last.processed_rows, 10);
        assert_eq!(last.estimated_time_remaining_ms, 0);
        assert!(last.throughput_mbps >= 0.0);
    }

    #[test]
    fn understated_size_never_reports_overflowing_progress() {
        let mut tracker = ProgressTracker::new(10, 100);
        let event = tracker.chunk_done(100, 0);
        tracker.chunk_done(100, 0);
        assert_eq!(event.total_bytes, 100);
        let event = tracker.add_rows(3);
        assert_eq!(event.total_chunks, 2);
        assert_eq!(event.processed_rows, 3);
        assert!(event.fraction() <= 1.0);
    }
}
