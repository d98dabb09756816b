//! Offspring viability.
//!
//! The hardware never decides on its own whether an offspring may be born;
//! it builds a [`DivideCandidate`] and asks the organism. [`ViabilityRules`]
//! is the standard rule set organisms can delegate to.

use crate::config::DivideConfig;
use crate::organism::{Fault, FaultKind};
use evolvm_data::Genome;

/// Everything the organism needs to judge a divide.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DivideCandidate {
    /// Offspring genome as it would be committed.
    pub genome: Genome,
    pub parent_size: usize,
    /// Offspring loci written by a copy.
    pub copied_size: usize,
    /// Parent loci executed during this gestation.
    pub executed_size: usize,
    /// Locus of the divide instruction in the parent.
    pub location: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViabilityRules {
    pub min_length: usize,
    pub max_length: usize,
    pub child_size_range: f64,
    pub min_copied_fraction: f64,
    pub min_executed_fraction: f64,
}

impl ViabilityRules {
    #[must_use]
    pub fn from_config(config: &DivideConfig) -> Self {
        Self {
            min_length: config.min_genome_length,
            max_length: config.max_genome_length,
            child_size_range: config.child_size_range,
            min_copied_fraction: config.min_copied_fraction,
            min_executed_fraction: config.min_executed_fraction,
        }
    }

    /// Accepts anything non-empty.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            min_length: 1,
            max_length: usize::MAX,
            child_size_range: f64::INFINITY,
            min_copied_fraction: 0.0,
            min_executed_fraction: 0.0,
        }
    }

    pub fn check(&self, candidate: &DivideCandidate) -> Result<(), Fault> {
        let child = candidate.genome.len();
        let parent = candidate.parent_size;
        let reject = |message: String| {
            Err(Fault::new(candidate.location, FaultKind::Divide, message))
        };

        if child < self.min_length || child > self.max_length {
            return reject(format!(
                "offspring length {child} outside [{}, {}]",
                self.min_length, self.max_length
            ));
        }

        let (child_f, parent_f) = (child as f64, parent as f64);
        if child_f > parent_f * self.child_size_range || child_f * self.child_size_range < parent_f
        {
            return reject(format!(
                "offspring length {child} too far from parent length {parent}"
            ));
        }

        if (candidate.copied_size as f64) < self.min_copied_fraction * child_f {
            return reject(format!(
                "only {} of {child} offspring loci copied",
                candidate.copied_size
            ));
        }

        if (candidate.executed_size as f64) < self.min_executed_fraction * parent_f {
            return reject(format!(
                "only {} of {parent} parent loci executed",
                candidate.executed_size
            ));
        }

        Ok(())
    }
}
