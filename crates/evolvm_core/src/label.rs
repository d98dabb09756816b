//! Content-addressed search over a memory space.
//!
//! A key is a run of no-op modifiers. Label searches require a `label`
//! marker instruction in front of the run; sequence searches match any run
//! of no-ops. Either way only a prefix match is needed: no-ops after the
//! last key element are ignored.

use crate::registry::InstSet;
use evolvm_data::{CodeLabel, MemorySpace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchDirection {
    /// From locus 0 to the end, no wraparound.
    Start,
    /// Circularly, starting one past the origin.
    Forward,
    /// Circularly, starting one before the origin.
    Backward,
}

/// A successful search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelMatch {
    /// Locus right after the last matched no-op, wrapped into the space.
    pub position: usize,
    /// First matched locus: the `label` marker, or the first no-op of a
    /// sequence match.
    pub start: usize,
    /// Number of matched no-ops.
    pub matched: usize,
}

impl LabelMatch {
    /// Circular distance from `origin` to the match.
    #[must_use]
    pub fn distance_from(&self, origin: usize, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.position + len - origin % len) % len
    }
}

/// Candidate start loci in scan order.
fn scan_order(len: usize, direction: SearchDirection, origin: usize) -> Box<dyn Iterator<Item = usize>> {
    if len == 0 {
        return Box::new(std::iter::empty());
    }
    let origin = origin % len;
    match direction {
        SearchDirection::Start => Box::new(0..len),
        SearchDirection::Forward => Box::new((1..len).map(move |step| (origin + step) % len)),
        SearchDirection::Backward => {
            Box::new((1..len).map(move |step| (origin + len - step) % len))
        }
    }
}

/// Checks the no-ops at `from..` against `key`. Circular searches let the
/// run continue past the end of the space at locus 0.
fn matches_at(
    memory: &MemorySpace,
    inst_set: &InstSet,
    key: &CodeLabel,
    from: usize,
    direction: SearchDirection,
) -> bool {
    let len = memory.len();
    let fits = match direction {
        SearchDirection::Start => from + key.len() <= len,
        SearchDirection::Forward | SearchDirection::Backward => key.len() <= len,
    };
    fits && key
        .as_slice()
        .iter()
        .enumerate()
        .all(|(i, &want)| inst_set.nop_mod(memory.get((from + i) % len)) == Some(want))
}

/// Finds a `label` marker followed by `key`.
#[must_use]
pub fn find_label(
    memory: &MemorySpace,
    inst_set: &InstSet,
    key: &CodeLabel,
    direction: SearchDirection,
    origin: usize,
) -> Option<LabelMatch> {
    if key.is_empty() {
        return None;
    }
    let len = memory.len();
    scan_order(len, direction, origin)
        .filter(|&pos| inst_set.is_label(memory.get(pos)))
        .find(|&pos| matches_at(memory, inst_set, key, pos + 1, direction))
        .map(|pos| LabelMatch {
            position: (pos + 1 + key.len()) % len,
            start: pos,
            matched: key.len(),
        })
}

/// Finds any run of no-ops beginning with `key`.
#[must_use]
pub fn find_nop_sequence(
    memory: &MemorySpace,
    inst_set: &InstSet,
    key: &CodeLabel,
    direction: SearchDirection,
    origin: usize,
) -> Option<LabelMatch> {
    if key.is_empty() {
        return None;
    }
    let len = memory.len();
    scan_order(len, direction, origin)
        .find(|&pos| matches_at(memory, inst_set, key, pos, direction))
        .map(|pos| LabelMatch {
            position: (pos + key.len()) % len,
            start: pos,
            matched: key.len(),
        })
}

/// Collects the run of no-ops that begins right after `ip`, up to `max`.
#[must_use]
pub fn read_label_at(memory: &MemorySpace, inst_set: &InstSet, ip: usize, max: usize) -> CodeLabel {
    let mut label = CodeLabel::new();
    let mut pos = ip + 1;
    while label.len() < max {
        match inst_set.nop_mod(memory.get(pos)) {
            Some(m) => label.push(m),
            None => break,
        }
        pos += 1;
    }
    label
}
