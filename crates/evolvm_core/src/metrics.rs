//! Execution statistics and logging setup.
//!
//! Each hardware instance keeps plain [`ExecutionStats`]. Drivers that run
//! many organisms fold them into one shared [`Metrics`], which is safe to
//! update from worker threads.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Per-organism counters. Plain integers: one hardware, one owner.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Attempts, stalled or not.
    pub cycles: u64,
    /// Instructions whose handler ran.
    pub executed: u64,
    /// Handlers that reported failure, including stochastic failures.
    pub failed: u64,
    pub stalls: u64,
    pub faults: u64,
    pub divides: u64,
    pub failed_divides: u64,
    pub copies: u64,
    pub copy_mutations: u64,
}

impl ExecutionStats {
    pub fn merge(&mut self, other: &ExecutionStats) {
        self.cycles += other.cycles;
        self.executed += other.executed;
        self.failed += other.failed;
        self.stalls += other.stalls;
        self.faults += other.faults;
        self.divides += other.divides;
        self.failed_divides += other.failed_divides;
        self.copies += other.copies;
        self.copy_mutations += other.copy_mutations;
    }
}

/// Shared aggregate over many organisms.
pub struct Metrics {
    cycles: AtomicU64,
    executed: AtomicU64,
    stalls: AtomicU64,
    faults: AtomicU64,
    divides: AtomicU64,
    failed_divides: AtomicU64,
    generations: AtomicU64,
    pub counters: Mutex<HashMap<String, AtomicU64>>,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            executed: AtomicU64::new(0),
            stalls: AtomicU64::new(0),
            faults: AtomicU64::new(0),
            divides: AtomicU64::new(0),
            failed_divides: AtomicU64::new(0),
            generations: AtomicU64::new(0),
            counters: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Folds in the statistics of one finished gestation.
    pub fn record_generation(&self, stats: &ExecutionStats, duration: Duration) {
        self.cycles.fetch_add(stats.cycles, Ordering::Relaxed);
        self.executed.fetch_add(stats.executed, Ordering::Relaxed);
        self.stalls.fetch_add(stats.stalls, Ordering::Relaxed);
        self.faults.fetch_add(stats.faults, Ordering::Relaxed);
        self.divides.fetch_add(stats.divides, Ordering::Relaxed);
        self.failed_divides
            .fetch_add(stats.failed_divides, Ordering::Relaxed);
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;

        // Log at info level every 100 generations
        if generation.is_multiple_of(100) {
            tracing::info!(
                generation = generation,
                cycles = self.cycles(),
                divides = self.divides(),
                faults = self.faults(),
                duration_us = duration.as_micros() as u64,
                "Lineage progress"
            );
        }
    }

    pub fn increment_counter(&self, name: &str) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn stalls(&self) -> u64 {
        self.stalls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn divides(&self) -> u64 {
        self.divides.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failed_divides(&self) -> u64 {
        self.failed_divides.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn generations(&self) -> u64 {
        self.generations.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Logs a summary of everything recorded so far.
    pub fn log_summary(&self) {
        tracing::info!(
            generations = self.generations(),
            cycles = self.cycles(),
            executed = self.executed(),
            stalls = self.stalls(),
            faults = self.faults(),
            divides = self.divides(),
            failed_divides = self.failed_divides(),
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Run summary"
        );
    }
}

/// Installs a global fmt subscriber at INFO. Later calls are no-ops.
pub fn init_logging() {
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::INFO)
            .finish(),
    )
    .ok();
}
