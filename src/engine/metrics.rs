//! SHELF - Flush Metrics & Observability
//! Atomic counters describing the write-back engine's activity. Async
//! flush failures have no caller to report to, so they are counted here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Atomic counters for the Shelf engine.
///
/// All counters use `Ordering::Relaxed`; they are for observation, not synchronization.
#[derive(Debug)]
pub struct FlushMetrics {
    /// Mutations (put/delete/batch/clear) applied to the store.
    pub mutations: AtomicU64,
    /// Flush requests absorbed by an already queued or in-flight flush.
    pub coalesced: AtomicU64,
    /// Successful flushes.
    pub flushes: AtomicU64,
    /// Failed flushes (iteration, serialization or I/O).
    pub flush_failures: AtomicU64,
    /// Total bytes handed to the durable writer by successful flushes.
    pub bytes_written: AtomicU64,
    /// Entries replayed into the store at open.
    pub entries_loaded: AtomicU64,
    engine_started: Instant,
}

impl FlushMetrics {
    pub fn new() -> Self {
        Self {
            mutations: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            entries_loaded: AtomicU64::new(0),
            engine_started: Instant::now(),
        }
    }

    pub fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self, bytes: usize) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self, entries: usize) {
        self.entries_loaded
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.flush_failures.load(Ordering::Relaxed)
    }

    /// Get engine uptime in seconds.
    pub fn uptime_secs(&self) -> f64 {
        self.engine_started.elapsed().as_secs_f64()
    }

    /// Mutations per flush; how well the debounce is coalescing.
    pub fn coalescing_ratio(&self) -> f64 {
        let flushes = self.flush_count();
        if flushes == 0 {
            return 0.0;
        }
        self.mutations.load(Ordering::Relaxed) as f64 / flushes as f64
    }

    /// Format metrics as a human-readable report.
    pub fn report(&self) -> String {
        format!(
            "\n═══ SHELF Engine Metrics ═══\n\
             Mutations:\n\
               applied:   {}\n\
               coalesced: {}\n\
             Flushes:\n\
               ok:        {}\n\
               failed:    {}\n\
               ratio:     {:.2} mutations/flush\n\
             I/O:\n\
               written:   {} bytes\n\
               loaded:    {} entries\n\
             Uptime: {:.2}s",
            self.mutations.load(Ordering::Relaxed),
            self.coalesced.load(Ordering::Relaxed),
            self.flush_count(),
            self.failure_count(),
            self.coalescing_ratio(),
            self.bytes_written.load(Ordering::Relaxed),
            self.entries_loaded.load(Ordering::Relaxed),
            self.uptime_secs(),
        )
    }
}

impl Default for FlushMetrics {
    fn default() -> Self {
        Self::new()
    }
}
