//! Error types for start-up failures of the virtual CPU.
//!
//! Everything here is a configuration problem detected before any organism
//! runs. Faults raised by instructions during a run are not errors; they are
//! reported to the organism as [`crate::organism::Fault`] values.

use thiserror::Error;

/// Main error type for evolvm_core.
#[derive(Error, Debug)]
pub enum VmError {
    /// Instruction name not present in the opcode library
    #[error("Unknown instruction: {0}")]
    UnknownInstruction(String),

    /// Instruction listed twice in one instruction set
    #[error("Duplicate instruction: {0}")]
    DuplicateInstruction(String),

    /// Structurally invalid instruction set
    #[error("Invalid instruction set: {0}")]
    InvalidInstSet(String),

    /// Genome that does not fit the instruction set or length limits
    #[error("Invalid genome: {0}")]
    InvalidGenome(String),

    /// Out-of-range configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<VmError>,
    },
}

/// Result type alias for evolvm_core operations.
pub type Result<T> = std::result::Result<T, VmError>;

impl VmError {
    /// Creates a new unknown-instruction error.
    #[must_use]
    pub fn unknown_instruction<S: Into<String>>(name: S) -> Self {
        Self::UnknownInstruction(name.into())
    }

    /// Creates a new invalid-instruction-set error.
    #[must_use]
    pub fn invalid_inst_set<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInstSet(msg.into())
    }

    /// Creates a new invalid-genome error.
    #[must_use]
    pub fn invalid_genome<S: Into<String>>(msg: S) -> Self {
        Self::InvalidGenome(msg.into())
    }

    /// Creates a new configuration error.
    #[must_use]
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Wraps an error with additional context.
    #[must_use]
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}
