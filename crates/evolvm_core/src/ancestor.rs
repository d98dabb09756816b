//! The shipped self-replicating ancestor.
//!
//! Twelve loci: mark the copy loop with FLOW, copy one locus per pass until
//! the trailing `label nop-A nop-B` has been copied, then divide.

use crate::error::Result;
use crate::registry::InstSet;
use evolvm_data::Genome;

pub const ANCESTOR: [&str; 12] = [
    "mov-head",
    "nop-D",
    "nop-A",
    "copy",
    "if-copied-lbl-comp",
    "nop-H",
    "nop-A",
    "divide",
    "mov-head",
    "label",
    "nop-A",
    "nop-B",
];

/// The ancestor encoded in `inst_set`. Fails if the set lacks one of its
/// instructions.
pub fn ancestor_genome(inst_set: &InstSet) -> Result<Genome> {
    Ok(Genome::new(inst_set.parse_names(ANCESTOR)?))
}
