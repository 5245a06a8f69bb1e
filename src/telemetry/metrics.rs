//! Scheduler counters and turn-latency tracking.

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::util::CachePadded;

/// Pool-wide metrics collector. Counter updates are relaxed atomics on
/// the hot path; the histogram takes a write lock but skips the sample
/// under contention rather than stalling a worker.
pub struct Metrics {
    turns: AtomicU64,
    steals: AtomicU64,
    spills: AtomicU64,
    waits: AtomicU64,
    turn_panics: AtomicU64,

    per_worker_turns: Box<[CachePadded<AtomicU64>]>,

    turn_latency: RwLock<Histogram<u64>>,

    /// Configured local-queue bound, echoed in snapshots so operators can
    /// correlate the spill counter with the knob that causes it.
    local_queue_limit: usize,

    start_time: Instant,
}

impl Metrics {
    pub fn new(workers: usize, local_queue_limit: usize) -> Self {
        // 3 significant figures, samples up to one minute per turn.
        let histogram =
            Histogram::new_with_max(60_000_000_000, 3).expect("failed to create histogram");

        Self {
            turns: AtomicU64::new(0),
            steals: AtomicU64::new(0),
            spills: AtomicU64::new(0),
            waits: AtomicU64::new(0),
            turn_panics: AtomicU64::new(0),
            per_worker_turns: (0..workers)
                .map(|_| CachePadded::new(AtomicU64::new(0)))
                .collect(),
            turn_latency: RwLock::new(histogram),
            local_queue_limit,
            start_time: Instant::now(),
        }
    }

    pub fn record_turn(&self, worker: usize, duration_ns: u64) {
        self.turns.fetch_add(1, Ordering::Relaxed);
        if let Some(counter) = self.per_worker_turns.get(worker) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(mut hist) = self.turn_latency.try_write() {
            let _ = hist.record(duration_ns);
        }
    }

    pub fn record_steal(&self, _worker: usize) {
        self.steals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_spill(&self) {
        self.spills.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_wait(&self) {
        self.waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_turn_panic(&self) {
        self.turn_panics.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let histogram = self.turn_latency.read();

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            turns: self.turns.load(Ordering::Relaxed),
            steals: self.steals.load(Ordering::Relaxed),
            spills: self.spills.load(Ordering::Relaxed),
            waits: self.waits.load(Ordering::Relaxed),
            turn_panics: self.turn_panics.load(Ordering::Relaxed),
            per_worker_turns: self
                .per_worker_turns
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .collect(),
            avg_turn_ns: if histogram.len() > 0 {
                histogram.mean() as u64
            } else {
                0
            },
            p50_turn_ns: histogram.value_at_quantile(0.50),
            p95_turn_ns: histogram.value_at_quantile(0.95),
            p99_turn_ns: histogram.value_at_quantile(0.99),
            max_turn_ns: histogram.max(),
            local_queue_limit: self.local_queue_limit,
        }
    }

    pub fn reset(&self) {
        self.turns.store(0, Ordering::Relaxed);
        self.steals.store(0, Ordering::Relaxed);
        self.spills.store(0, Ordering::Relaxed);
        self.waits.store(0, Ordering::Relaxed);
        self.turn_panics.store(0, Ordering::Relaxed);
        for counter in self.per_worker_turns.iter() {
            counter.store(0, Ordering::Relaxed);
        }
        if let Some(mut hist) = self.turn_latency.try_write() {
            hist.reset();
        }
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("turns", &self.turns.load(Ordering::Relaxed))
            .field("steals", &self.steals.load(Ordering::Relaxed))
            .field("spills", &self.spills.load(Ordering::Relaxed))
            .finish()
    }
}

/// Snapshot of scheduler metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub uptime: std::time::Duration,
    /// Actor turns completed.
    pub turns: u64,
    /// Successful steals from peer queues.
    pub steals: u64,
    /// Owner pushes redirected to the global queue by the local bound.
    pub spills: u64,
    /// Poll misses that ended in a waiter call.
    pub waits: u64,
    /// Turns in which at least one message handler panicked.
    pub turn_panics: u64,
    /// Turns per worker, indexed by worker id.
    pub per_worker_turns: Vec<u64>,
    pub avg_turn_ns: u64,
    pub p50_turn_ns: u64,
    pub p95_turn_ns: u64,
    pub p99_turn_ns: u64,
    pub max_turn_ns: u64,
    /// The configured local-queue spill bound.
    pub local_queue_limit: usize,
}

impl MetricsSnapshot {
    /// Turns per second since pool start.
    pub fn turns_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.turns as f64 / seconds
    }

    /// Fraction of turns acquired by stealing.
    pub fn steal_ratio(&self) -> f64 {
        if self.turns == 0 {
            return 0.0;
        }
        self.steals as f64 / self.turns as f64
    }
}
