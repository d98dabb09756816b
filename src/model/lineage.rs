//! Lineage runs.
//!
//! A lineage starts from one genome. Each generation runs the current parent
//! in an [`IsolatedOrganism`] until it produces its first offspring, and that
//! offspring becomes the next parent. A parent that dies or exhausts its call
//! budget without dividing ends the lineage.

use anyhow::Context;
use evolvm_core::{AppConfig, ExecutionStats, Genome, Hardware, InstSet, IsolatedOrganism, Metrics};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRecord {
    pub generation: u32,
    pub parent_len: usize,
    pub offspring_len: usize,
    /// Hardware calls until the first divide.
    pub calls: u32,
    pub cycles: u64,
    /// Offspring differs from its parent.
    pub mutated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineageReport {
    pub seed: u64,
    pub generations: Vec<GenerationRecord>,
    /// Generation whose parent failed to divide.
    pub extinct_at: Option<u32>,
    pub final_genome: Genome,
    pub stats: ExecutionStats,
}

impl LineageReport {
    #[must_use]
    pub fn mean_gestation(&self) -> Option<f64> {
        if self.generations.is_empty() {
            return None;
        }
        let total: u64 = self.generations.iter().map(|g| g.cycles).sum();
        Some(total as f64 / self.generations.len() as f64)
    }

    #[must_use]
    pub fn mutated_generations(&self) -> usize {
        self.generations.iter().filter(|g| g.mutated).count()
    }
}

struct Gestation {
    offspring: Option<Genome>,
    calls: u32,
    stats: ExecutionStats,
}

pub struct LineageRunner {
    inst_set: Arc<InstSet>,
    config: Arc<AppConfig>,
    max_calls: u32,
    metrics: Arc<Metrics>,
}

impl LineageRunner {
    pub const DEFAULT_MAX_CALLS: u32 = 100_000;

    #[must_use]
    pub fn new(inst_set: Arc<InstSet>, config: Arc<AppConfig>) -> Self {
        Self {
            inst_set,
            config,
            max_calls: Self::DEFAULT_MAX_CALLS,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Calls a parent gets before it is declared sterile.
    #[must_use]
    pub fn with_max_calls(mut self, max_calls: u32) -> Self {
        self.max_calls = max_calls;
        self
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn run(&self, ancestor: &Genome, generations: u32, seed: u64) -> anyhow::Result<LineageReport> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut parent = ancestor.clone();
        let mut records = Vec::with_capacity(generations as usize);
        let mut stats = ExecutionStats::default();
        let mut extinct_at = None;

        for generation in 0..generations {
            let started = Instant::now();
            let gestation = self
                .gestate(&parent, rng.gen())
                .with_context(|| format!("lineage {seed}, generation {generation}"))?;
            stats.merge(&gestation.stats);

            let Some(child) = gestation.offspring else {
                tracing::debug!(seed, generation, calls = gestation.calls, "Lineage went extinct");
                self.metrics.increment_counter("extinct");
                extinct_at = Some(generation);
                break;
            };
            self.metrics
                .record_generation(&gestation.stats, started.elapsed());

            let record = GenerationRecord {
                generation,
                parent_len: parent.len(),
                offspring_len: child.len(),
                calls: gestation.calls,
                cycles: gestation.stats.cycles,
                mutated: child != parent,
            };
            tracing::debug!(
                seed,
                generation,
                cycles = record.cycles,
                len = record.offspring_len,
                mutated = record.mutated,
                "Generation complete"
            );
            if record.mutated {
                self.metrics.increment_counter("mutated");
            }
            records.push(record);
            parent = child;
        }

        Ok(LineageReport {
            seed,
            generations: records,
            extinct_at,
            final_genome: parent,
            stats,
        })
    }

    /// Runs `replicates` independent lineages in parallel.
    ///
    /// Results are in replicate order; replicate `r` uses
    /// [`replicate_seed`]`(base_seed, r)`.
    pub fn run_replicates(
        &self,
        ancestor: &Genome,
        generations: u32,
        base_seed: u64,
        replicates: u32,
    ) -> Vec<anyhow::Result<LineageReport>> {
        (0..replicates)
            .into_par_iter()
            .map(|r| self.run(ancestor, generations, replicate_seed(base_seed, r)))
            .collect()
    }

    fn gestate(&self, genome: &Genome, seed: u64) -> anyhow::Result<Gestation> {
        let mut hw = Hardware::new(Arc::clone(&self.inst_set), Arc::clone(&self.config), genome)?;
        let mut org = IsolatedOrganism::from_config(&self.config, seed);
        let mut calls = 0;
        while org.offspring.is_empty() && org.is_alive() && calls < self.max_calls {
            hw.step(&mut org);
            calls += 1;
        }
        Ok(Gestation {
            offspring: org.take_offspring().into_iter().next(),
            calls,
            stats: hw.stats().clone(),
        })
    }
}

#[must_use]
pub fn replicate_seed(base_seed: u64, replicate: u32) -> u64 {
    base_seed.wrapping_add(u64::from(replicate))
}
