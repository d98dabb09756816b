//! Configuration for the virtual CPU.
//!
//! Strongly-typed structures mapping to a `config.toml` file. Every section
//! has defaults, so an empty file is a valid configuration.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! seed = 42
//!
//! [hardware]
//! max_threads = 4
//!
//! [scheduler]
//! policy = "behavior-classed"
//!
//! [mutation]
//! copy_mut_prob = 0.0075
//!
//! [divide]
//! method = "split"
//!
//! [[instset]]
//! name = "copy"
//! cost = 2
//! ```

use serde::{Deserialize, Serialize};

/// Limits of one hardware instance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HardwareConfig {
    /// Longest label or nop sequence `read_label` collects.
    pub max_label_size: usize,
    /// How many label loci a search marks as executed.
    pub max_label_exe_size: usize,
    /// Upper bound on concurrent execution contexts.
    pub max_threads: usize,
    /// Executed-instruction count after which the organism dies; 0 disables.
    pub max_executed: u64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            max_label_size: 10,
            max_label_exe_size: 1,
            max_threads: 8,
            max_executed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulingPolicy {
    /// Fixed micro-op count per call, round-robin over active contexts.
    #[default]
    RoundRobin,
    /// Genes with throttled behavior classes, one use per class per call.
    BehaviorClassed,
}

/// How round robin spends a call's micro-op slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ThreadSlicing {
    /// Each slot gives one attempt to every active context.
    #[default]
    PerContext,
    /// Each slot is a single attempt, shared by all contexts in turn.
    Shared,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub policy: SchedulingPolicy,
    /// Micro-op slots per call under round robin.
    pub micro_ops_per_call: u32,
    pub slicing: ThreadSlicing,
    /// Hard cap on attempts per call under behavior classing.
    pub max_exec_per_call: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            policy: SchedulingPolicy::RoundRobin,
            micro_ops_per_call: 1,
            slicing: ThreadSlicing::PerContext,
            max_exec_per_call: 20,
        }
    }
}

/// How a span slip fills newly duplicated loci.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SlipFillMode {
    /// Copy the duplicated span verbatim.
    #[default]
    Duplicate,
    /// Fill with `nop-X`.
    NopX,
    /// Fill with random instructions.
    Random,
    /// Duplicate then shuffle the inserted span.
    Scrambled,
}

/// Mutation events a hardware instance can ask the organism to test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationEvent {
    CopyPoint,
    CopyInsert,
    CopyDelete,
    CopyUniform,
    CopySlip,
    DivideMutation,
    DivideInsert,
    DivideDelete,
    DivideUniform,
    DivideSlip,
    DividePointMutation,
    DividePointInsert,
    DividePointDelete,
}

/// Per-event probabilities. All rates default to zero.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MutationRates {
    pub copy_mut_prob: f64,
    pub copy_ins_prob: f64,
    pub copy_del_prob: f64,
    pub copy_uniform_prob: f64,
    pub copy_slip_prob: f64,
    pub divide_mut_prob: f64,
    pub divide_ins_prob: f64,
    pub divide_del_prob: f64,
    pub divide_uniform_prob: f64,
    pub divide_slip_prob: f64,
    pub divide_point_mut_prob: f64,
    pub divide_point_ins_prob: f64,
    pub divide_point_del_prob: f64,
    pub slip_fill_mode: SlipFillMode,
    /// A copy slip jumps the read head instead of duplicating a span.
    pub slip_read_head: bool,
}

impl Default for MutationRates {
    fn default() -> Self {
        Self {
            copy_mut_prob: 0.0,
            copy_ins_prob: 0.0,
            copy_del_prob: 0.0,
            copy_uniform_prob: 0.0,
            copy_slip_prob: 0.0,
            divide_mut_prob: 0.0,
            divide_ins_prob: 0.0,
            divide_del_prob: 0.0,
            divide_uniform_prob: 0.0,
            divide_slip_prob: 0.0,
            divide_point_mut_prob: 0.0,
            divide_point_ins_prob: 0.0,
            divide_point_del_prob: 0.0,
            slip_fill_mode: SlipFillMode::Duplicate,
            slip_read_head: true,
        }
    }
}

impl MutationRates {
    #[must_use]
    pub fn probability(&self, event: MutationEvent) -> f64 {
        match event {
            MutationEvent::CopyPoint => self.copy_mut_prob,
            MutationEvent::CopyInsert => self.copy_ins_prob,
            MutationEvent::CopyDelete => self.copy_del_prob,
            MutationEvent::CopyUniform => self.copy_uniform_prob,
            MutationEvent::CopySlip => self.copy_slip_prob,
            MutationEvent::DivideMutation => self.divide_mut_prob,
            MutationEvent::DivideInsert => self.divide_ins_prob,
            MutationEvent::DivideDelete => self.divide_del_prob,
            MutationEvent::DivideUniform => self.divide_uniform_prob,
            MutationEvent::DivideSlip => self.divide_slip_prob,
            MutationEvent::DividePointMutation => self.divide_point_mut_prob,
            MutationEvent::DividePointInsert => self.divide_point_ins_prob,
            MutationEvent::DividePointDelete => self.divide_point_del_prob,
        }
    }

    fn all(&self) -> [(&'static str, f64); 13] {
        [
            ("copy_mut_prob", self.copy_mut_prob),
            ("copy_ins_prob", self.copy_ins_prob),
            ("copy_del_prob", self.copy_del_prob),
            ("copy_uniform_prob", self.copy_uniform_prob),
            ("copy_slip_prob", self.copy_slip_prob),
            ("divide_mut_prob", self.divide_mut_prob),
            ("divide_ins_prob", self.divide_ins_prob),
            ("divide_del_prob", self.divide_del_prob),
            ("divide_uniform_prob", self.divide_uniform_prob),
            ("divide_slip_prob", self.divide_slip_prob),
            ("divide_point_mut_prob", self.divide_point_mut_prob),
            ("divide_point_ins_prob", self.divide_point_ins_prob),
            ("divide_point_del_prob", self.divide_point_del_prob),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DivideMethod {
    /// Only the offspring is produced; the parent keeps running as is.
    Offspring,
    /// Both halves restart: the parent is fully reset.
    #[default]
    Split,
    /// The current context's heads and registers are reset.
    Birth,
}

/// Viability limits checked when an organism divides.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DivideConfig {
    pub method: DivideMethod,
    /// Offspring allocated by `alloc` relative to parent length.
    pub offspring_size_range: f64,
    /// Maximum ratio between parent and offspring lengths, either way.
    pub child_size_range: f64,
    pub min_copied_fraction: f64,
    pub min_executed_fraction: f64,
    pub min_genome_length: usize,
    pub max_genome_length: usize,
}

impl Default for DivideConfig {
    fn default() -> Self {
        Self {
            method: DivideMethod::Split,
            offspring_size_range: 2.0,
            child_size_range: 2.0,
            min_copied_fraction: 0.5,
            min_executed_fraction: 0.5,
            min_genome_length: 8,
            max_genome_length: 2048,
        }
    }
}

/// One instruction-set entry as written in configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InstEntryConfig {
    pub name: String,
    #[serde(default = "default_cost")]
    pub cost: u32,
    #[serde(default)]
    pub first_time_cost: u32,
    #[serde(default)]
    pub post_cost: u32,
    #[serde(default)]
    pub prob_fail: f64,
    #[serde(default = "default_redundancy")]
    pub redundancy: u32,
}

fn default_cost() -> u32 {
    1
}

fn default_redundancy() -> u32 {
    1
}

impl InstEntryConfig {
    /// An entry with unit cost and weight.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cost: default_cost(),
            first_time_cost: 0,
            post_cost: 0,
            prob_fail: 0.0,
            redundancy: default_redundancy(),
        }
    }
}

/// Top-level configuration.
///
/// An empty `instset` selects the full standard library.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub seed: Option<u64>,
    pub hardware: HardwareConfig,
    pub scheduler: SchedulerConfig,
    pub mutation: MutationRates,
    pub divide: DivideConfig,
    pub instset: Vec<InstEntryConfig>,
}

impl AppConfig {
    /// Validates all configuration parameters.
    ///
    /// Instruction names are resolved later, by
    /// [`crate::registry::InstSet::from_config`].
    pub fn validate(&self) -> anyhow::Result<()> {
        // Hardware
        anyhow::ensure!(
            self.hardware.max_threads >= 1,
            "Max threads must be at least 1"
        );
        anyhow::ensure!(
            self.hardware.max_threads <= 256,
            "Max threads too large (max 256)"
        );
        anyhow::ensure!(
            self.hardware.max_label_size >= 1,
            "Max label size must be positive"
        );
        anyhow::ensure!(
            self.hardware.max_label_exe_size <= self.hardware.max_label_size,
            "Max label exe size cannot exceed max label size"
        );

        // Scheduler
        anyhow::ensure!(
            self.scheduler.micro_ops_per_call >= 1,
            "Micro ops per call must be positive"
        );
        anyhow::ensure!(
            self.scheduler.max_exec_per_call >= 1,
            "Max exec per call must be positive"
        );

        // Mutation
        for (name, p) in self.mutation.all() {
            anyhow::ensure!((0.0..=1.0).contains(&p), "{name} must be in [0.0, 1.0]");
        }

        // Divide
        let d = &self.divide;
        anyhow::ensure!(
            d.offspring_size_range > 0.0,
            "Offspring size range must be positive"
        );
        anyhow::ensure!(
            d.child_size_range >= 1.0,
            "Child size range must be at least 1.0"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&d.min_copied_fraction),
            "Min copied fraction must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&d.min_executed_fraction),
            "Min executed fraction must be in [0.0, 1.0]"
        );
        anyhow::ensure!(d.min_genome_length >= 1, "Min genome length must be positive");
        anyhow::ensure!(
            d.min_genome_length <= d.max_genome_length,
            "Min genome length cannot exceed max genome length"
        );

        for entry in &self.instset {
            anyhow::ensure!(
                (0.0..=1.0).contains(&entry.prob_fail),
                "prob_fail of {} must be in [0.0, 1.0]",
                entry.name
            );
        }

        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Stable digest of everything that affects execution.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.hardware).as_bytes());
        hasher.update(format!("{:?}", self.scheduler).as_bytes());
        hasher.update(format!("{:?}", self.mutation).as_bytes());
        hasher.update(format!("{:?}", self.divide).as_bytes());
        hasher.update(format!("{:?}", self.instset).as_bytes());
        hex::encode(hasher.finalize())
    }
}
