//! Mutation operators.
//!
//! Operators act on one memory space at a time. Whether an event fires is
//! decided by the organism's per-event test; this module only applies it.

use crate::config::SlipFillMode;
use crate::registry::InstSet;
use evolvm_data::{Instruction, LocusFlags, MemorySpace};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

/// Genome length limits an operator must respect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LengthBounds {
    pub min: usize,
    pub max: usize,
}

impl LengthBounds {
    #[must_use]
    pub const fn can_grow(&self, len: usize, by: usize) -> bool {
        len + by <= self.max
    }

    #[must_use]
    pub const fn can_shrink(&self, len: usize, by: usize) -> bool {
        len >= by && len - by >= self.min && len - by > 0
    }
}

/// What a uniform mutation did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformOutcome {
    Substituted(usize),
    Deleted(usize),
    Inserted(usize),
    Skipped,
}

pub fn substitute(
    mem: &mut MemorySpace,
    pos: usize,
    inst_set: &InstSet,
    rng: &mut dyn RngCore,
    flag: LocusFlags,
) {
    if pos >= mem.len() {
        return;
    }
    let inst = inst_set.random_instruction(rng);
    mem.set(pos, inst);
    mem.set_flag(pos, LocusFlags::MUTATED.union(flag));
}

/// Inserts a random instruction at `pos`, clamped to the append slot.
pub fn insert_random(
    mem: &mut MemorySpace,
    pos: usize,
    inst_set: &InstSet,
    rng: &mut dyn RngCore,
    bounds: LengthBounds,
) -> bool {
    if !bounds.can_grow(mem.len(), 1) {
        return false;
    }
    let pos = pos.min(mem.len());
    mem.insert(pos, inst_set.random_instruction(rng));
    mem.set_flag(pos, LocusFlags::MUTATED);
    true
}

pub fn delete_at(mem: &mut MemorySpace, pos: usize, bounds: LengthBounds) -> bool {
    if pos >= mem.len() || !bounds.can_shrink(mem.len(), 1) {
        return false;
    }
    mem.remove(pos).is_some()
}

/// One event at a random locus: draws `m` in `[0, 2N + 1)` for `N`
/// instructions; `m < N` substitutes instruction `m`, `m == N` deletes,
/// larger values insert instruction `m - N - 1`.
pub fn uniform(
    mem: &mut MemorySpace,
    inst_set: &InstSet,
    rng: &mut dyn RngCore,
    bounds: LengthBounds,
) -> UniformOutcome {
    if mem.is_empty() {
        return UniformOutcome::Skipped;
    }
    let n = inst_set.len();
    let pos = rng.gen_range(0..mem.len());
    let m = rng.gen_range(0..2 * n + 1);
    if m < n {
        mem.set(pos, Instruction(m as u8));
        mem.set_flag(pos, LocusFlags::MUTATED);
        UniformOutcome::Substituted(pos)
    } else if m == n {
        if delete_at(mem, pos, bounds) {
            UniformOutcome::Deleted(pos)
        } else {
            UniformOutcome::Skipped
        }
    } else if bounds.can_grow(mem.len(), 1) {
        mem.insert(pos, Instruction((m - n - 1) as u8));
        mem.set_flag(pos, LocusFlags::MUTATED);
        UniformOutcome::Inserted(pos)
    } else {
        UniformOutcome::Skipped
    }
}

/// Duplicates or deletes a contiguous span. Returns the length change.
///
/// Two loci `from` and `to` are drawn; `from > to` re-inserts `[to, from)`
/// at `from`, `from < to` removes `[from, to)`.
pub fn span_slip(
    mem: &mut MemorySpace,
    inst_set: &InstSet,
    rng: &mut dyn RngCore,
    fill: SlipFillMode,
    bounds: LengthBounds,
) -> isize {
    let len = mem.len();
    if len == 0 {
        return 0;
    }
    let from = rng.gen_range(0..=len);
    let to = rng.gen_range(0..=len);

    if from > to {
        let span = from - to;
        if !bounds.can_grow(len, span) {
            return 0;
        }
        let mut inserted: Vec<Instruction> = match fill {
            SlipFillMode::Duplicate | SlipFillMode::Scrambled => {
                mem.instructions()[to..from].to_vec()
            }
            SlipFillMode::NopX => vec![inst_set.fill_instruction(); span],
            SlipFillMode::Random => (0..span)
                .map(|_| inst_set.random_instruction(rng))
                .collect(),
        };
        if fill == SlipFillMode::Scrambled {
            inserted.shuffle(rng);
        }
        mem.splice(from..from, &inserted);
        for pos in from..from + span {
            mem.set_flag(pos, LocusFlags::MUTATED);
        }
        span as isize
    } else if from < to {
        let span = to - from;
        if !bounds.can_shrink(len, span) {
            return 0;
        }
        mem.splice(from..to, &[]);
        -(span as isize)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const WIDE: LengthBounds = LengthBounds { min: 1, max: 4096 };

    fn sample(len: usize) -> MemorySpace {
        MemorySpace::from_instructions((0..len).map(|i| Instruction((i % 20) as u8)).collect())
    }

    #[test]
    fn test_substitute_flags_locus() {
        let set = InstSet::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut mem = sample(10);
        substitute(&mut mem, 3, &set, &mut rng, LocusFlags::COPY_MUTATED);
        assert!(mem.has_flag(3, LocusFlags::MUTATED));
        assert!(mem.has_flag(3, LocusFlags::COPY_MUTATED));
        assert_eq!(mem.len(), 10);
    }

    #[test]
    fn test_insert_and_delete_respect_bounds() {
        let set = InstSet::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let tight = LengthBounds { min: 10, max: 10 };
        let mut mem = sample(10);
        assert!(!insert_random(&mut mem, 0, &set, &mut rng, tight));
        assert!(!delete_at(&mut mem, 0, tight));
        assert!(insert_random(&mut mem, 99, &set, &mut rng, WIDE));
        assert_eq!(mem.len(), 11);
        assert!(mem.has_flag(10, LocusFlags::MUTATED));
        assert!(delete_at(&mut mem, 0, WIDE));
        assert_eq!(mem.len(), 10);
    }

    #[test]
    fn test_uniform_changes_at_most_one_locus_count() {
        let set = InstSet::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let mut mem = sample(16);
            let outcome = uniform(&mut mem, &set, &mut rng, WIDE);
            match outcome {
                UniformOutcome::Substituted(_) => assert_eq!(mem.len(), 16),
                UniformOutcome::Deleted(_) => assert_eq!(mem.len(), 15),
                UniformOutcome::Inserted(_) => assert_eq!(mem.len(), 17),
                UniformOutcome::Skipped => assert_eq!(mem.len(), 16),
            }
        }
    }

    #[test]
    fn test_span_slip_length_change_matches_return() {
        let set = InstSet::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for mode in [
            SlipFillMode::Duplicate,
            SlipFillMode::NopX,
            SlipFillMode::Random,
            SlipFillMode::Scrambled,
        ] {
            for _ in 0..50 {
                let mut mem = sample(20);
                let delta = span_slip(&mut mem, &set, &mut rng, mode, WIDE);
                assert_eq!(mem.len() as isize, 20 + delta);
            }
        }
    }

    #[test]
    fn test_span_slip_duplicate_repeats_span() {
        let set = InstSet::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let original = sample(12);
        for _ in 0..100 {
            let mut mem = original.clone();
            let delta = span_slip(&mut mem, &set, &mut rng, SlipFillMode::Duplicate, WIDE);
            if delta > 0 {
                // Every inserted locus repeats the one `delta` positions earlier.
                let inserted: Vec<usize> = (0..mem.len())
                    .filter(|&p| mem.has_flag(p, LocusFlags::MUTATED))
                    .collect();
                for p in inserted {
                    assert_eq!(mem.get(p), mem.get(p - delta as usize));
                }
                return;
            }
        }
        panic!("no duplication drawn in 100 attempts");
    }
}
