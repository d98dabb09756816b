//! Splitting a genome into behavior-classed genes.

use crate::registry::InstSet;
use evolvm_data::{BehaviorClass, MemorySpace};

/// A contiguous range of the parent with its own code space.
#[derive(Clone, Debug, PartialEq)]
pub struct Gene {
    /// First parent locus.
    pub start: usize,
    /// One past the last parent locus.
    pub end: usize,
    pub class: BehaviorClass,
    /// Private copy of `parent[start..end]`.
    pub memory: MemorySpace,
}

impl Gene {
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

fn throttled_class(inst_set: &InstSet, memory: &MemorySpace, pos: usize) -> Option<BehaviorClass> {
    let class = inst_set.behavior(memory.get(pos));
    class.is_throttled().then_some(class)
}

/// Class of the first throttled instruction at or after `from`, wrapping.
fn next_class(inst_set: &InstSet, memory: &MemorySpace, from: usize) -> Option<BehaviorClass> {
    let len = memory.len();
    (0..len).find_map(|step| throttled_class(inst_set, memory, (from + step) % len))
}

/// Splits `memory` into genes that cover it without overlap.
///
/// A `start-gene` opens a gene classed by the following no-op (modifier
/// modulo three), or by the class after the current one. An `end-gene`
/// closes the current gene, itself included. A throttled instruction of a
/// different class than the open gene starts a new gene.
#[must_use]
pub fn split_genes(memory: &MemorySpace, inst_set: &InstSet) -> Vec<Gene> {
    let len = memory.len();
    let mut genes = Vec::new();
    if len == 0 {
        return genes;
    }

    let mut close = |start: usize, end: usize, class: BehaviorClass| {
        if end > start {
            genes.push(Gene {
                start,
                end,
                class,
                memory: MemorySpace::from_instructions(memory.instructions()[start..end].to_vec()),
            });
        }
    };

    let mut class = next_class(inst_set, memory, 0).unwrap_or(BehaviorClass::Input);
    let mut start = 0;

    for pos in 0..len {
        match inst_set.behavior(memory.get(pos)) {
            BehaviorClass::StartGene => {
                close(start, pos, class);
                start = pos;
                class = match inst_set.nop_mod(memory.get(pos + 1)) {
                    Some(m) => BehaviorClass::from_slot(usize::from(m)),
                    None => BehaviorClass::from_slot(class.slot().unwrap_or(0) + 1),
                };
            }
            BehaviorClass::EndGene => {
                close(start, pos + 1, class);
                start = pos + 1;
                if let Some(next) = next_class(inst_set, memory, pos + 1) {
                    class = next;
                }
            }
            other if other.is_throttled() && other != class => {
                close(start, pos, class);
                start = pos;
                class = other;
            }
            _ => {}
        }
    }
    close(start, len, class);
    genes
}
