pub mod macros;

use evolvm_lib::model::config::{AppConfig, SchedulingPolicy, ThreadSlicing};
use evolvm_lib::model::divide::ViabilityRules;
use evolvm_lib::model::state::Genome;
use evolvm_lib::model::{ancestor, Hardware, InstSet, IsolatedOrganism};
use std::sync::Arc;

#[allow(dead_code)]
pub struct HardwareBuilder {
    config: AppConfig,
    inst_set: InstSet,
    names: Vec<String>,
    genome: Option<Genome>,
    seed: u64,
    permissive: bool,
    inputs: Option<Vec<i32>>,
}

#[allow(dead_code)]
impl HardwareBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            inst_set: InstSet::standard(),
            names: Vec::new(),
            genome: None,
            seed: 42,
            permissive: false,
            inputs: None,
        }
    }

    /// Genome given as instruction names.
    pub fn with_genome(mut self, names: &[&str]) -> Self {
        self.names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_raw_genome(mut self, genome: Genome) -> Self {
        self.genome = Some(genome);
        self
    }

    pub fn with_ancestor(mut self) -> Self {
        self.names = ancestor::ANCESTOR.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_inst_set(mut self, inst_set: InstSet) -> Self {
        self.inst_set = inst_set;
        self
    }

    pub fn with_policy(mut self, policy: SchedulingPolicy) -> Self {
        self.config.scheduler.policy = policy;
        self
    }

    pub fn with_slicing(mut self, slicing: ThreadSlicing) -> Self {
        self.config.scheduler.slicing = slicing;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Accept every divide regardless of the configured rules.
    pub fn with_permissive_divide(mut self) -> Self {
        self.permissive = true;
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<i32>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn build(self) -> (Hardware, IsolatedOrganism) {
        let genome = match self.genome {
            Some(genome) => genome,
            None => Genome::new(
                self.inst_set
                    .parse_names(self.names.iter().map(String::as_str))
                    .expect("Unknown instruction in test genome"),
            ),
        };
        let mut org = if self.permissive {
            IsolatedOrganism::new(
                self.seed,
                self.config.mutation.clone(),
                ViabilityRules::permissive(),
            )
        } else {
            IsolatedOrganism::from_config(&self.config, self.seed)
        };
        if let Some(inputs) = self.inputs {
            org = org.with_inputs(inputs);
        }
        let hw = Hardware::new(Arc::new(self.inst_set), Arc::new(self.config), &genome)
            .expect("Failed to create hardware in test builder");
        (hw, org)
    }
}

/// Steps until the first offspring, death, or `max_calls`.
#[allow(dead_code)]
pub fn run_until_offspring(
    hw: &mut Hardware,
    org: &mut IsolatedOrganism,
    max_calls: u32,
) -> Option<Genome> {
    let mut calls = 0;
    while org.offspring.is_empty() && org.is_alive() && calls < max_calls {
        hw.step(org);
        calls += 1;
    }
    org.take_offspring().into_iter().next()
}

#[allow(dead_code)]
pub fn registers(hw: &Hardware, ctx: usize) -> [i32; 8] {
    let context = hw.context(ctx).expect("Context not found");
    std::array::from_fn(|i| context.reg_value(i))
}
