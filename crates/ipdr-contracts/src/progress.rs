//! Progress events emitted by the streaming processor.

use serde::{Deserialize, Serialize};

/// Snapshot of file-processing progress, emitted once per chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub processed_bytes: u64,
    pub total_bytes: u64,
    pub processed_rows: u64,
    pub estimated_time_remaining_ms: u64,
    /// 1-based index of the chunk just processed.
    pub current_chunk: u64,
    pub total_chunks: u64,
    /// Smoothed throughput in megabytes per second.
    pub throughput_mbps: f64,
}

impl ProgressEvent {
    /// Fraction complete in `0.0..=1.0`. An empty file counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.processed_bytes as f64 / self.total_bytes as f64).min(1.0)
    }
}
