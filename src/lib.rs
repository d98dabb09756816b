//! # evolvm
//!
//! Headless driver for the evolvm virtual CPU. The CPU itself lives in
//! `evolvm_core`; this crate re-exports it under [`model`] and adds the
//! lineage runner that feeds each offspring back in as the next parent.

pub mod model;
