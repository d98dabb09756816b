//! The collaborator interfaces the hardware calls out to.
//!
//! The hardware owns no world state. Inputs, outputs, offspring, faults,
//! death and randomness all go through an [`Organism`]; directional queries
//! go through an optional [`Sensor`].

use crate::config::{MutationEvent, MutationRates};
use crate::cost::StallReason;
use crate::divide::DivideCandidate;
use evolvm_data::{Genome, Instruction};
use rand::{Rng, RngCore};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultKind {
    Arithmetic,
    ThreadLimit,
    MissingSensor,
    Allocation,
    Divide,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Arithmetic => "arithmetic",
            Self::ThreadLimit => "thread-limit",
            Self::MissingSensor => "missing-sensor",
            Self::Allocation => "allocation",
            Self::Divide => "divide",
        };
        f.write_str(name)
    }
}

/// A recoverable instruction fault.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fault {
    /// Locus of the faulting instruction in its code space.
    pub location: usize,
    pub kind: FaultKind,
    pub message: String,
}

impl Fault {
    #[must_use]
    pub fn new<S: Into<String>>(location: usize, kind: FaultKind, message: S) -> Self {
        Self {
            location,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fault at {}: {}", self.kind, self.location, self.message)
    }
}

/// Arguments of a directional query, taken from `AX`..`DX`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SensorQuery {
    pub habitat: i32,
    pub distance: i32,
    pub search_type: i32,
    pub id: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SensorReading {
    pub distance: i32,
    pub count: i32,
    pub value: i32,
    pub group: i32,
}

pub trait Sensor {
    fn query(&mut self, query: &SensorQuery) -> SensorReading;
}

/// Diagnostic events. Never needed for correctness.
#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent {
    Executed {
        context: u32,
        position: usize,
        instruction: Instruction,
        success: bool,
    },
    Stalled {
        context: u32,
        position: usize,
        instruction: Instruction,
        reason: StallReason,
    },
    Divided {
        offspring_len: usize,
    },
    DivideRejected {
        reason: String,
    },
    ThreadForked {
        parent: u32,
        child: u32,
    },
    ThreadKilled {
        context: u32,
    },
}

/// Everything the hardware needs from the organism it runs.
pub trait Organism {
    fn next_input(&mut self) -> i32;

    /// Notification that `value` was read as input.
    fn do_input(&mut self, _value: i32) {}

    fn do_output(&mut self, value: i32);

    /// Returns `true` when the offspring may be born.
    fn check_divide_viability(&mut self, candidate: &DivideCandidate) -> bool;

    /// Hands over a born offspring. Returns `true` while the parent survives.
    fn activate_offspring(&mut self, genome: Genome) -> bool;

    fn fault(&mut self, fault: Fault);

    fn die(&mut self);

    fn is_running(&self) -> bool;

    fn set_running(&mut self, running: bool);

    fn rng(&mut self) -> &mut dyn RngCore;

    fn mutation_rates(&self) -> &MutationRates;

    /// Per-event mutation test.
    fn test_mutation(&mut self, event: MutationEvent) -> bool {
        let p = self.mutation_rates().probability(event);
        p > 0.0 && self.rng().gen_bool(p.min(1.0))
    }

    fn do_move(&mut self) -> bool {
        false
    }

    fn do_rotate(&mut self, _amount: i32) -> bool {
        false
    }

    fn sensor(&mut self) -> Option<&mut dyn Sensor> {
        None
    }

    fn trace(&mut self, _event: &TraceEvent) {}
}
