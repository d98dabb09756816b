//! # evolvm data
//!
//! Plain value types shared by the virtual CPU and the export tooling:
//! instructions, memory spaces with per-locus flags, genomes, code labels
//! and provenance-tagged registers. Everything here derives serde and rkyv
//! so the in-memory layout is what gets exported.

pub mod data;

pub use data::instruction::{BehaviorClass, Instruction};
pub use data::label::CodeLabel;
pub use data::memory::{Genome, LocusFlags, MemorySpace};
pub use data::register::Register;
