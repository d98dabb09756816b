//! # evolvm core
//!
//! A virtual CPU for digital evolution. Programs are genomes: sequences of
//! one-byte instructions that copy themselves into an offspring memory space
//! and divide.
//!
//! This crate contains:
//! - The instruction registry and the configured instruction set
//! - Heads, registers, stacks and execution contexts
//! - Content-addressed label search
//! - Copy-time and divide-time mutation operators
//! - Per-instruction cost accounting
//! - Two schedulers: round robin and behavior-classed
//! - The divide controller and viability rules
//! - Metrics collection and structured logging
//!
//! ## Architecture
//!
//! A [`Hardware`] never reaches into world state. Everything outside the
//! program goes through the [`Organism`] trait: inputs and outputs, the
//! random source, mutation tests, viability, offspring activation and death.
//! The [`InstSet`] is built once from configuration and shared by `Arc`.
//!
//! ## Example
//!
//! ```
//! use evolvm_core::{ancestor_genome, AppConfig, Hardware, InstSet, IsolatedOrganism};
//! use std::sync::Arc;
//!
//! let config = AppConfig::default();
//! let inst_set = Arc::new(InstSet::standard());
//! let genome = ancestor_genome(&inst_set).unwrap();
//! let mut hardware = Hardware::new(inst_set, Arc::new(config.clone()), &genome).unwrap();
//! let mut organism = IsolatedOrganism::from_config(&config, 42);
//!
//! while organism.offspring.is_empty() {
//!     hardware.step(&mut organism);
//! }
//! assert_eq!(organism.offspring[0], genome);
//! ```

/// The shipped self-replicating ancestor genome
pub mod ancestor;
/// Configuration: hardware limits, scheduling, mutation rates, divide rules
pub mod config;
/// Execution contexts, stacks and wait conditions
pub mod context;
/// Per-instruction cost ledger
pub mod cost;
/// Divide candidates and standard viability rules
pub mod divide;
/// Configuration errors
pub mod error;
/// The virtual CPU and its instruction handlers
pub mod hardware;
/// Heads and the memory spaces they bind to
pub mod head;
/// A self-contained organism for running one genome in isolation
pub mod isolated;
/// Label and no-op sequence search
pub mod label;
/// Execution statistics and logging setup
pub mod metrics;
/// Mutation operators
pub mod mutation;
/// Collaborator traits: organism and sensor
pub mod organism;
/// Opcode library and instruction sets
pub mod registry;

pub use ancestor::{ancestor_genome, ANCESTOR};
pub use config::{
    AppConfig, DivideMethod, MutationEvent, MutationRates, SchedulingPolicy, ThreadSlicing,
};
pub use error::{Result, VmError};
pub use hardware::{split_genes, Gene, Hardware};
pub use isolated::IsolatedOrganism;
pub use metrics::{init_logging, ExecutionStats, Metrics};
pub use organism::{Fault, FaultKind, Organism, Sensor, SensorQuery, SensorReading, TraceEvent};
pub use registry::{InstSet, Opcode};
pub use evolvm_data::{Genome, Instruction, LocusFlags, MemorySpace};
