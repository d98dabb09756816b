//! Core data structures for the evolvm virtual CPU.

pub mod instruction;
pub mod label;
pub mod memory;
pub mod register;
