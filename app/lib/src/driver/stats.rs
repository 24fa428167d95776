//! Per-run conversion counters.
//!
//! [`ConversionStats`] is shared by all pair workers of a run. Every counter
//! is an independent atomic updated with `Ordering::Relaxed`, so a
//! [`StatsSnapshot`] taken during a run is per-counter valid but not
//! necessarily consistent across counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Thread-safe conversion counters.
#[derive(Debug, Default)]
pub struct ConversionStats {
    pairs_succeeded: AtomicUsize,
    pairs_failed: AtomicUsize,
    bytes_written: AtomicU64,
    encode_micros: AtomicU64,
}

impl ConversionStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pair that produced its output.
    pub fn record_success(&self, bytes: u64, elapsed: Duration) {
        self.pairs_succeeded.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
        self.add_elapsed(elapsed);
    }

    /// Record a pair that failed.
    pub fn record_failure(&self, elapsed: Duration) {
        self.pairs_failed.fetch_add(1, Ordering::Relaxed);
        self.add_elapsed(elapsed);
    }

    fn add_elapsed(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.encode_micros.fetch_add(micros, Ordering::Relaxed);
    }

    /// Number of pairs that succeeded so far.
    pub fn get_pairs_succeeded(&self) -> usize {
        self.pairs_succeeded.load(Ordering::Relaxed)
    }

    /// Number of pairs that failed so far.
    pub fn get_pairs_failed(&self) -> usize {
        self.pairs_failed.load(Ordering::Relaxed)
    }

    /// Bytes of output on disk. Outputs held by an in-memory store count 0.
    pub fn get_bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Take a point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pairs_succeeded: self.get_pairs_succeeded(),
            pairs_failed: self.get_pairs_failed(),
            bytes_written: self.get_bytes_written(),
            encode_time: Duration::from_micros(self.encode_micros.load(Ordering::Relaxed)),
        }
    }
}

/// Immutable copy of [`ConversionStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Pairs that produced their output
    pub pairs_succeeded: usize,
    /// Pairs that failed
    pub pairs_failed: usize,
    /// Total bytes written to disk
    pub bytes_written: u64,
    /// Summed encode time across all pairs
    pub encode_time: Duration,
}

impl StatsSnapshot {
    /// Total pairs attempted.
    pub fn pairs(&self) -> usize {
        self.pairs_succeeded + self.pairs_failed
    }
}
