//! A self-contained organism for running one genome outside a population.
//!
//! Inputs come from a seeded generator, outputs and offspring are recorded,
//! and divides are judged by [`ViabilityRules`].

use crate::config::{AppConfig, MutationRates};
use crate::divide::{DivideCandidate, ViabilityRules};
use crate::organism::{Fault, Organism, Sensor, TraceEvent};
use evolvm_data::Genome;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Top bytes of the three environment inputs.
const INPUT_TAGS: [i32; 3] = [0x0f, 0x33, 0x55];

pub struct IsolatedOrganism {
    rng: ChaCha8Rng,
    rates: MutationRates,
    rules: ViabilityRules,
    inputs: Vec<i32>,
    input_cursor: usize,
    pub outputs: Vec<i32>,
    pub offspring: Vec<Genome>,
    pub faults: Vec<Fault>,
    pub trace_log: Option<Vec<TraceEvent>>,
    /// Returned from `activate_offspring`.
    pub parent_survives: bool,
    pub moves: u32,
    pub rotation: i32,
    sensor: Option<Box<dyn Sensor + Send>>,
    running: bool,
    alive: bool,
}

impl IsolatedOrganism {
    #[must_use]
    pub fn new(seed: u64, rates: MutationRates, rules: ViabilityRules) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let inputs = INPUT_TAGS
            .iter()
            .map(|tag| (tag << 24) | (rng.gen::<i32>() & 0x00ff_ffff))
            .collect();
        Self {
            rng,
            rates,
            rules,
            inputs,
            input_cursor: 0,
            outputs: Vec::new(),
            offspring: Vec::new(),
            faults: Vec::new(),
            trace_log: None,
            parent_survives: true,
            moves: 0,
            rotation: 0,
            sensor: None,
            running: false,
            alive: true,
        }
    }

    /// Mutation rates and divide rules from configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig, seed: u64) -> Self {
        Self::new(
            seed,
            config.mutation.clone(),
            ViabilityRules::from_config(&config.divide),
        )
    }

    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<i32>) -> Self {
        self.inputs = inputs;
        self.input_cursor = 0;
        self
    }

    #[must_use]
    pub fn with_sensor(mut self, sensor: Box<dyn Sensor + Send>) -> Self {
        self.sensor = Some(sensor);
        self
    }

    #[must_use]
    pub fn with_trace(mut self) -> Self {
        self.trace_log = Some(Vec::new());
        self
    }

    #[must_use]
    pub fn inputs(&self) -> &[i32] {
        &self.inputs
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Removes and returns the recorded offspring.
    pub fn take_offspring(&mut self) -> Vec<Genome> {
        std::mem::take(&mut self.offspring)
    }
}

impl Organism for IsolatedOrganism {
    fn next_input(&mut self) -> i32 {
        if self.inputs.is_empty() {
            return 0;
        }
        let value = self.inputs[self.input_cursor % self.inputs.len()];
        self.input_cursor += 1;
        value
    }

    fn do_output(&mut self, value: i32) {
        self.outputs.push(value);
    }

    fn check_divide_viability(&mut self, candidate: &DivideCandidate) -> bool {
        match self.rules.check(candidate) {
            Ok(()) => true,
            Err(fault) => {
                self.faults.push(fault);
                false
            }
        }
    }

    fn activate_offspring(&mut self, genome: Genome) -> bool {
        self.offspring.push(genome);
        self.parent_survives
    }

    fn fault(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    fn die(&mut self) {
        self.alive = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    fn rng(&mut self) -> &mut dyn RngCore {
        &mut self.rng
    }

    fn mutation_rates(&self) -> &MutationRates {
        &self.rates
    }

    fn do_move(&mut self) -> bool {
        self.moves += 1;
        true
    }

    fn do_rotate(&mut self, amount: i32) -> bool {
        self.rotation = (self.rotation + amount).rem_euclid(8);
        true
    }

    fn sensor(&mut self) -> Option<&mut dyn Sensor> {
        match self.sensor.as_mut() {
            Some(sensor) => Some(sensor.as_mut() as &mut dyn Sensor),
            None => None,
        }
    }

    fn trace(&mut self, event: &TraceEvent) {
        if let Some(log) = self.trace_log.as_mut() {
            log.push(event.clone());
        }
    }
}
