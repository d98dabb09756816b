use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One locus of a genome: an index into the configured instruction set.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(transparent)]
pub struct Instruction(pub u8);

impl Instruction {
    /// Returned when a head reads past the end of its memory space.
    pub const ERROR: Instruction = Instruction(u8::MAX);

    #[must_use]
    pub const fn new(op: u8) -> Self {
        Self(op)
    }

    #[must_use]
    pub const fn op(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 == u8::MAX
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

/// Coarse instruction category used by the behavior-classed scheduler.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub enum BehaviorClass {
    /// Sensed input (`input`, `look-ahead`).
    Input,
    /// World-affecting action (`output`, `move`).
    Action,
    /// Replication step (`copy`, `divide`).
    Copy,
    /// Unthrottled computation.
    None,
    /// Scheduling marker that opens a new gene.
    StartGene,
    /// Scheduling marker that closes the current gene.
    EndGene,
}

impl BehaviorClass {
    /// Number of throttled classes.
    pub const THROTTLED: usize = 3;

    /// Slot of a throttled class, `None` for free classes and markers.
    #[must_use]
    pub const fn slot(self) -> Option<usize> {
        match self {
            Self::Input => Some(0),
            Self::Action => Some(1),
            Self::Copy => Some(2),
            _ => None,
        }
    }

    #[must_use]
    pub const fn from_slot(slot: usize) -> Self {
        match slot % Self::THROTTLED {
            0 => Self::Input,
            1 => Self::Action,
            _ => Self::Copy,
        }
    }

    #[must_use]
    pub const fn is_throttled(self) -> bool {
        self.slot().is_some()
    }
}
