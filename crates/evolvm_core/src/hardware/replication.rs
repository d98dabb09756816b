//! Allocation, copying and division of the offspring.

use super::Hardware;
use crate::config::{DivideMethod, MutationEvent};
use crate::divide::DivideCandidate;
use crate::head::{HeadKind, SpaceId};
use crate::mutation::{self, LengthBounds};
use crate::organism::{FaultKind, Organism, TraceEvent};
use crate::registry::InstSet;
use evolvm_data::{Instruction, LocusFlags, MemorySpace};
use rand::Rng;
use std::sync::Arc;

impl Hardware {
    /// Tracks the label and no-op run most recently passed by the read head.
    fn read_inst(&mut self, inst: Instruction) {
        let max = self.config.hardware.max_label_size;
        let is_label = self.inst_set.is_label(inst);
        let nop = self.inst_set.nop_mod(inst);
        let ctx = &mut self.contexts[self.cur];

        match nop {
            Some(m) => {
                if ctx.reading_label && ctx.read_label.len() < max {
                    ctx.read_label.push(m);
                }
                if ctx.read_seq.len() < max {
                    ctx.read_seq.push(m);
                }
                ctx.reading_seq = true;
            }
            None => {
                ctx.read_label.clear();
                ctx.reading_label = is_label;
                ctx.read_seq.clear();
                ctx.reading_seq = false;
            }
        }
    }

    fn copy_bounds(&self) -> LengthBounds {
        LengthBounds {
            min: 1,
            max: self.config.divide.max_genome_length,
        }
    }

    /// Sizes the offspring space once per gestation.
    pub(super) fn inst_alloc(&mut self, org: &mut dyn Organism) -> bool {
        if self.has_alloc {
            self.fault(org, FaultKind::Allocation, "alloc: offspring already allocated");
            return false;
        }
        let divide = &self.config.divide;
        let parent_len = self.parent.len();
        let wanted = (divide.offspring_size_range * parent_len as f64) as usize;
        let size = wanted.min(divide.max_genome_length.saturating_sub(parent_len));
        if size == 0 {
            self.fault(org, FaultKind::Allocation, "alloc: no room for an offspring");
            return false;
        }

        let fill = self.inst_set.fill_instruction();
        self.memory_mut(SpaceId::Offspring).resize(size, fill);
        self.has_alloc = true;
        tracing::debug!(size, "Allocated offspring");
        true
    }

    /// Copies READ to WRITE, applying copy-time mutations, and advances both.
    pub(super) fn inst_copy(&mut self, org: &mut dyn Organism) -> bool {
        let ctx = self.cur;
        let inst_set = Arc::clone(&self.inst_set);
        self.adjust_head(ctx, HeadKind::Read);
        self.adjust_head(ctx, HeadKind::Write);
        let (read_space, read_pos) = self.head_location(ctx, HeadKind::Read);
        let (write_space, write_pos) = self.head_location(ctx, HeadKind::Write);

        let mut inst = self.memory(read_space).get(read_pos);
        self.read_inst(inst);
        let mutated = org.test_mutation(MutationEvent::CopyPoint);
        if mutated {
            inst = inst_set.random_instruction(org.rng());
        }

        self.memory_mut(read_space).set_flag(read_pos, LocusFlags::COPIED);
        let target = self.memory_mut(write_space);
        target.set(write_pos, inst);
        target.set_flag(write_pos, LocusFlags::COPIED);
        if mutated {
            target.set_flag(write_pos, LocusFlags::MUTATED.union(LocusFlags::COPY_MUTATED));
            self.stats.copy_mutations += 1;
        }
        self.stats.copies += 1;

        let write_step = self.copy_mutations(org, &inst_set, write_space, write_pos);

        self.advance_head(ctx, HeadKind::Read);
        let write = self.contexts[ctx].head_mut(HeadKind::Write);
        write.jump(write_step);
        self.adjust_head(ctx, HeadKind::Write);
        true
    }

    /// Insertion, deletion, uniform and slip after a copy. Returns how far
    /// the write head should move.
    fn copy_mutations(
        &mut self,
        org: &mut dyn Organism,
        inst_set: &InstSet,
        space: SpaceId,
        pos: usize,
    ) -> i64 {
        let bounds = self.copy_bounds();
        let mut step = 1;

        if org.test_mutation(MutationEvent::CopyInsert) {
            let target = self.memory_mut(space);
            if mutation::insert_random(target, pos, inst_set, org.rng(), bounds) {
                step += 1;
            }
        }
        if org.test_mutation(MutationEvent::CopyDelete) {
            let target = self.memory_mut(space);
            if mutation::delete_at(target, pos, bounds) {
                step -= 1;
            }
        }
        if org.test_mutation(MutationEvent::CopyUniform) {
            let target = self.memory_mut(space);
            mutation::uniform(target, inst_set, org.rng(), bounds);
        }
        if org.test_mutation(MutationEvent::CopySlip) {
            if org.mutation_rates().slip_read_head {
                let len = self.parent.len();
                let pos = org.rng().gen_range(0..len);
                let ctx = self.cur;
                self.contexts[ctx].head_mut(HeadKind::Read).set(pos as i64);
                // The read head advances after this; land on the drawn locus.
                self.contexts[ctx].head_mut(HeadKind::Read).jump(-1);
            } else {
                let fill = org.mutation_rates().slip_fill_mode;
                let target = self.memory_mut(space);
                mutation::span_slip(target, inst_set, org.rng(), fill, bounds);
            }
        }
        step
    }

    pub(super) fn inst_divide(&mut self, org: &mut dyn Organism) -> bool {
        let ctx = self.cur;
        self.adjust_head(ctx, HeadKind::Write);
        let (_, write_pos) = self.head_location(ctx, HeadKind::Write);
        self.divide_offspring(org, write_pos)
    }

    /// Copies the whole parent at once, then divides.
    pub(super) fn inst_repro(&mut self, org: &mut dyn Organism) -> bool {
        let inst_set = Arc::clone(&self.inst_set);
        let mut child = MemorySpace::from_instructions(self.parent.instructions().to_vec());
        for pos in 0..child.len() {
            if org.test_mutation(MutationEvent::CopyPoint) {
                mutation::substitute(&mut child, pos, &inst_set, org.rng(), LocusFlags::COPY_MUTATED);
                self.stats.copy_mutations += 1;
            }
            child.set_flag(pos, LocusFlags::COPIED);
        }
        self.stats.copies += child.len() as u64;
        let len = child.len();
        self.offspring = Some(child);
        self.divide_offspring(org, len)
    }

    /// Offers `offspring[..write_pos]` for birth.
    ///
    /// A rejected candidate is discarded along with the allocation; the
    /// parent, its heads and its registers are left as they were.
    pub(super) fn divide_offspring(&mut self, org: &mut dyn Organism, write_pos: usize) -> bool {
        let location = self.contexts[self.cur].ip().position();
        let Some(offspring) = self.offspring.as_ref() else {
            tracing::debug!(location, "Divide without offspring");
            return false;
        };
        if offspring.is_empty() || write_pos == 0 {
            tracing::debug!(location, "Divide with nothing copied");
            return false;
        }

        let end = write_pos.min(offspring.len());
        let candidate = DivideCandidate {
            genome: offspring.prefix_genome(end),
            parent_size: self.parent.len(),
            copied_size: offspring.flag_slice()[..end]
                .iter()
                .filter(|f| f.contains(LocusFlags::COPIED))
                .count(),
            executed_size: self.parent.count_flag(LocusFlags::EXECUTED),
            location,
        };

        if !org.check_divide_viability(&candidate) {
            self.offspring = None;
            self.has_alloc = false;
            self.stats.failed_divides += 1;
            let reason = format!(
                "offspring of {} from parent of {} ({} copied, {} executed)",
                end, candidate.parent_size, candidate.copied_size, candidate.executed_size
            );
            tracing::debug!(%reason, "Divide rejected");
            org.trace(&TraceEvent::DivideRejected { reason });
            return false;
        }

        let Some(mut child) = self.offspring.take() else {
            return false;
        };
        child.truncate(end);
        self.divide_mutations(org, &mut child);
        let offspring_len = child.len();
        self.stats.divides += 1;

        let parent_alive = org.activate_offspring(child.to_genome());
        self.has_alloc = false;
        self.has_copied_end = false;
        self.parent
            .clear_flag_all(LocusFlags::COPIED.union(LocusFlags::MUTATED));

        tracing::debug!(
            offspring_len,
            parent_len = self.parent.len(),
            cycles = self.cycle_count,
            "Divided"
        );
        org.trace(&TraceEvent::Divided { offspring_len });

        if parent_alive {
            match self.config.divide.method {
                DivideMethod::Offspring => {}
                DivideMethod::Split => {
                    self.reset();
                    self.advance_ip = false;
                }
                DivideMethod::Birth => {
                    let cur = self.cur;
                    self.contexts[cur].reset();
                    self.advance_ip = false;
                }
            }
        }
        true
    }

    /// Divide-time mutations on the committed offspring.
    fn divide_mutations(&mut self, org: &mut dyn Organism, child: &mut MemorySpace) {
        let inst_set = Arc::clone(&self.inst_set);
        let bounds = LengthBounds {
            min: self.config.divide.min_genome_length,
            max: self.config.divide.max_genome_length,
        };

        if !child.is_empty() && org.test_mutation(MutationEvent::DivideMutation) {
            let pos = org.rng().gen_range(0..child.len());
            mutation::substitute(child, pos, &inst_set, org.rng(), LocusFlags::empty());
        }
        if org.test_mutation(MutationEvent::DivideInsert) {
            let pos = org.rng().gen_range(0..=child.len());
            mutation::insert_random(child, pos, &inst_set, org.rng(), bounds);
        }
        if !child.is_empty() && org.test_mutation(MutationEvent::DivideDelete) {
            let pos = org.rng().gen_range(0..child.len());
            mutation::delete_at(child, pos, bounds);
        }
        if org.test_mutation(MutationEvent::DivideUniform) {
            mutation::uniform(child, &inst_set, org.rng(), bounds);
        }
        if org.test_mutation(MutationEvent::DivideSlip) {
            let fill = org.mutation_rates().slip_fill_mode;
            mutation::span_slip(child, &inst_set, org.rng(), fill, bounds);
        }

        let rates = org.mutation_rates();
        let (point_mut, point_ins, point_del) = (
            rates.divide_point_mut_prob > 0.0,
            rates.divide_point_ins_prob > 0.0,
            rates.divide_point_del_prob > 0.0,
        );
        if point_mut {
            for pos in 0..child.len() {
                if org.test_mutation(MutationEvent::DividePointMutation) {
                    mutation::substitute(child, pos, &inst_set, org.rng(), LocusFlags::POINT_MUTATED);
                }
            }
        }
        if point_ins {
            for pos in (0..=child.len()).rev() {
                if org.test_mutation(MutationEvent::DividePointInsert) {
                    mutation::insert_random(child, pos, &inst_set, org.rng(), bounds);
                }
            }
        }
        if point_del {
            for pos in (0..child.len()).rev() {
                if org.test_mutation(MutationEvent::DividePointDelete) {
                    mutation::delete_at(child, pos, bounds);
                }
            }
        }
    }
}
