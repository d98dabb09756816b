//! The virtual CPU.
//!
//! One [`Hardware`] runs one organism's program. It owns the parent memory
//! space, the offspring under construction, the gene spaces (behavior-classed
//! scheduling only) and every execution context. The instruction set and
//! configuration are shared read-only across all hardware instances.
//!
//! Each attempt follows the same order: fetch at the IP, pay cost or stall,
//! mark the IP executed, apply stochastic failure, run the handler, then
//! advance the IP unless the handler moved it.

mod genes;
mod instructions;
mod modifiers;
mod replication;
mod scheduler;
mod threads;

pub use genes::{split_genes, Gene};

use crate::config::{AppConfig, SchedulingPolicy};
use crate::context::{ExecContext, NUM_REGISTERS};
use crate::cost::{CostLedger, CostOutcome, StallReason};
use crate::error::{Result, VmError};
use crate::head::{HeadKind, SpaceId};
use crate::metrics::ExecutionStats;
use crate::organism::{Fault, FaultKind, Organism, TraceEvent};
use crate::registry::InstSet;
use evolvm_data::{BehaviorClass, Genome, Instruction, LocusFlags, MemorySpace, Register};
use rand::Rng;
use std::sync::Arc;

static EMPTY_SPACE: MemorySpace = MemorySpace::new();

/// Result of one attempt on a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Attempt {
    /// Cost not yet paid; nothing ran.
    Stalled,
    /// Cost paid and the instruction ran, successfully or not.
    Executed { success: bool },
}

pub struct Hardware {
    inst_set: Arc<InstSet>,
    config: Arc<AppConfig>,
    parent: MemorySpace,
    offspring: Option<MemorySpace>,
    genes: Vec<Gene>,
    contexts: Vec<ExecContext>,
    cur: usize,
    /// Context chosen by `jump-thread` to run next.
    next_context: Option<usize>,
    next_thread_id: u32,
    ledger: CostLedger,
    cycle_count: u64,
    advance_ip: bool,
    has_alloc: bool,
    has_copied_end: bool,
    to_die: bool,
    used_classes: [bool; BehaviorClass::THROTTLED],
    stats: ExecutionStats,
}

impl Hardware {
    /// Loads `genome` as the parent program.
    pub fn new(inst_set: Arc<InstSet>, config: Arc<AppConfig>, genome: &Genome) -> Result<Self> {
        if genome.is_empty() {
            return Err(VmError::invalid_genome("genome is empty"));
        }
        if let Some((pos, inst)) = genome
            .iter()
            .enumerate()
            .find(|(_, inst)| !inst_set.contains(*inst))
        {
            return Err(VmError::invalid_genome(format!(
                "byte 0x{inst} at locus {pos} is outside the instruction set"
            )));
        }

        let ledger = CostLedger::new(&inst_set);
        let mut hw = Self {
            inst_set,
            config,
            parent: MemorySpace::from_genome(genome),
            offspring: None,
            genes: Vec::new(),
            contexts: Vec::new(),
            cur: 0,
            next_context: None,
            next_thread_id: 0,
            ledger,
            cycle_count: 0,
            advance_ip: true,
            has_alloc: false,
            has_copied_end: false,
            to_die: false,
            used_classes: [false; BehaviorClass::THROTTLED],
            stats: ExecutionStats::default(),
        };
        hw.reset();
        Ok(hw)
    }

    /// Rebuilds every context from the parent genome, as at birth.
    pub fn reset(&mut self) {
        self.parent.clear_flag_all(LocusFlags(u8::MAX));
        self.offspring = None;
        self.genes.clear();
        self.contexts.clear();

        match self.config.scheduler.policy {
            SchedulingPolicy::RoundRobin => {
                self.contexts.push(ExecContext::new(0, SpaceId::Parent));
            }
            SchedulingPolicy::BehaviorClassed => {
                self.genes = split_genes(&self.parent, &self.inst_set);
                for n in 0..self.genes.len() {
                    self.contexts.push(ExecContext::new(n as u32, SpaceId::Gene(n)));
                }
            }
        }

        self.next_thread_id = self.contexts.len() as u32;
        self.cur = 0;
        self.next_context = None;
        self.ledger.reset(&self.inst_set);
        self.cycle_count = 0;
        self.advance_ip = true;
        self.has_alloc = false;
        self.has_copied_end = false;
        self.to_die = false;
        self.used_classes = [false; BehaviorClass::THROTTLED];
    }

    // ---- accessors ------------------------------------------------------

    #[must_use]
    pub fn inst_set(&self) -> &InstSet {
        &self.inst_set
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn parent(&self) -> &MemorySpace {
        &self.parent
    }

    #[must_use]
    pub fn offspring(&self) -> Option<&MemorySpace> {
        self.offspring.as_ref()
    }

    #[must_use]
    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    #[must_use]
    pub fn contexts(&self) -> &[ExecContext] {
        &self.contexts
    }

    #[must_use]
    pub fn context(&self, idx: usize) -> Option<&ExecContext> {
        self.contexts.get(idx)
    }

    /// Index of the context that runs next.
    #[must_use]
    pub fn current(&self) -> usize {
        self.cur
    }

    #[must_use]
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Attempts since birth or the last split.
    #[must_use]
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    #[must_use]
    pub fn has_alloc(&self) -> bool {
        self.has_alloc
    }

    #[must_use]
    pub fn has_copied_end(&self) -> bool {
        self.has_copied_end
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.contexts.iter().filter(|c| c.status.is_active()).count()
    }

    #[must_use]
    pub fn memory(&self, space: SpaceId) -> &MemorySpace {
        match space {
            SpaceId::Parent => &self.parent,
            SpaceId::Offspring => self.offspring.as_ref().unwrap_or(&EMPTY_SPACE),
            SpaceId::Gene(n) => self.genes.get(n).map_or(&EMPTY_SPACE, |g| &g.memory),
        }
    }

    /// Mutable access; touching the offspring space creates it.
    fn memory_mut(&mut self, space: SpaceId) -> &mut MemorySpace {
        match space {
            SpaceId::Parent => &mut self.parent,
            SpaceId::Offspring => self.offspring.get_or_insert_with(MemorySpace::new),
            SpaceId::Gene(n) => match self.genes.get_mut(n) {
                Some(gene) => &mut gene.memory,
                None => &mut self.parent,
            },
        }
    }

    /// Writes a register of context `ctx` from outside, waking waiters.
    pub fn set_register(&mut self, ctx: usize, reg: usize, value: i32) {
        let value = Register::constant(value, self.cycle_count);
        self.write_register(ctx, reg % NUM_REGISTERS, value);
    }

    /// Moves a head of context `ctx` from outside.
    pub fn set_head(&mut self, ctx: usize, kind: HeadKind, pos: usize) {
        if let Some(context) = self.contexts.get_mut(ctx) {
            context.head_mut(kind).set(pos as i64);
        }
        self.adjust_head(ctx, kind);
    }

    // ---- head plumbing --------------------------------------------------

    /// Positions a head may occupy. The offspring space has an append slot.
    fn extent(&self, space: SpaceId) -> usize {
        let len = self.memory(space).len();
        match space {
            SpaceId::Offspring => len + 1,
            _ => len,
        }
    }

    fn adjust_head(&mut self, ctx: usize, kind: HeadKind) {
        let Some(space) = self.contexts.get(ctx).map(|c| c.head(kind).space()) else {
            return;
        };
        let extent = self.extent(space);
        self.contexts[ctx].head_mut(kind).normalize(extent);
    }

    fn head_location(&self, ctx: usize, kind: HeadKind) -> (SpaceId, usize) {
        let head = self.contexts[ctx].head(kind);
        (head.space(), head.position())
    }

    fn advance_head(&mut self, ctx: usize, kind: HeadKind) {
        if let Some(context) = self.contexts.get_mut(ctx) {
            context.head_mut(kind).advance();
        }
        self.adjust_head(ctx, kind);
    }

    /// Parent-relative offset of a space's locus 0.
    fn space_origin(&self, space: SpaceId) -> i64 {
        match space {
            SpaceId::Gene(n) => self.genes.get(n).map_or(0, |g| g.start as i64),
            _ => 0,
        }
    }

    /// Moves head `dst` onto head `src`, translating between the parent and
    /// gene spaces. Positions to or from the offspring are taken as is.
    fn set_head_to_head(&mut self, ctx: usize, dst: HeadKind, src: HeadKind) {
        let (src_space, src_pos) = self.head_location(ctx, src);
        let dst_space = self.contexts[ctx].head(dst).space();
        let pos = if src_space == dst_space
            || src_space == SpaceId::Offspring
            || dst_space == SpaceId::Offspring
        {
            src_pos as i64
        } else {
            src_pos as i64 + self.space_origin(src_space) - self.space_origin(dst_space)
        };
        self.contexts[ctx].head_mut(dst).set(pos);
        self.adjust_head(ctx, dst);
    }

    /// Sets EXECUTED on a locus, mirrored into the parent for gene spaces.
    fn mark_executed(&mut self, space: SpaceId, pos: usize) {
        self.memory_mut(space).set_flag(pos, LocusFlags::EXECUTED);
        if let SpaceId::Gene(n) = space {
            if let Some(start) = self.genes.get(n).map(|g| g.start) {
                self.parent.set_flag(start + pos, LocusFlags::EXECUTED);
            }
        }
    }

    // ---- registers ------------------------------------------------------

    fn reg(&self, idx: usize) -> Register {
        *self.contexts[self.cur].reg(idx)
    }

    /// Writes a register of the current context.
    fn set_reg(&mut self, idx: usize, value: Register) {
        self.write_register(self.cur, idx, value);
    }

    fn fault(&mut self, org: &mut dyn Organism, kind: FaultKind, message: &str) {
        let location = self
            .contexts
            .get(self.cur)
            .map_or(0, |c| c.ip().position());
        self.stats.faults += 1;
        tracing::debug!(location, %kind, detail = message, "Instruction fault");
        org.fault(Fault::new(location, kind, message));
    }

    // ---- the execution cycle --------------------------------------------

    /// One attempt on the current context. Returns `true` when an
    /// instruction ran and succeeded.
    pub fn single_process(&mut self, org: &mut dyn Organism) -> bool {
        self.attempt(org) == Attempt::Executed { success: true }
    }

    pub(crate) fn attempt(&mut self, org: &mut dyn Organism) -> Attempt {
        let ctx = self.cur;
        if ctx >= self.contexts.len() {
            return Attempt::Stalled;
        }
        self.cycle_count += 1;
        self.stats.cycles += 1;

        self.adjust_head(ctx, HeadKind::Ip);
        let (space, pos) = self.head_location(ctx, HeadKind::Ip);
        let inst = self.memory(space).get(pos);
        let context_id = self.contexts[ctx].id;

        let inst_set = Arc::clone(&self.inst_set);
        let outcome = if self.ledger.pay_post(ctx) {
            CostOutcome::Stalled(StallReason::PostCost)
        } else {
            self.ledger.pay(ctx, inst, &inst_set)
        };
        if let CostOutcome::Stalled(reason) = outcome {
            self.stats.stalls += 1;
            tracing::trace!(context = context_id, position = pos, ?reason, "Stalled");
            org.trace(&TraceEvent::Stalled {
                context: context_id,
                position: pos,
                instruction: inst,
                reason,
            });
            return Attempt::Stalled;
        }

        self.advance_ip = true;
        self.mark_executed(space, pos);

        let success = match inst_set.entry(inst) {
            Some(entry) => {
                if entry.prob_fail > 0.0 && org.rng().gen_bool(entry.prob_fail.min(1.0)) {
                    false
                } else {
                    self.stats.executed += 1;
                    let ok = self.execute(org, entry.opcode);
                    if ok {
                        self.ledger.set_post(ctx, entry.post_cost);
                    }
                    ok
                }
            }
            None => false,
        };
        if !success {
            self.stats.failed += 1;
        }

        if self.advance_ip {
            self.advance_head(ctx, HeadKind::Ip);
        }

        tracing::trace!(
            context = context_id,
            position = pos,
            instruction = inst_set.name(inst),
            success,
            "Executed"
        );
        org.trace(&TraceEvent::Executed {
            context: context_id,
            position: pos,
            instruction: inst,
            success,
        });
        Attempt::Executed { success }
    }

    /// Runs `inst` on the current context as if it sat at the IP, without
    /// cost accounting.
    pub fn execute_instruction(&mut self, org: &mut dyn Organism, inst: Instruction) -> bool {
        match self.inst_set.opcode(inst) {
            Some(op) => {
                self.advance_ip = true;
                self.execute(org, op)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InstEntryConfig, MutationRates};
    use crate::divide::ViabilityRules;
    use crate::isolated::IsolatedOrganism;

    fn hardware(names: &[&str]) -> Hardware {
        let set = Arc::new(InstSet::standard());
        let genome = Genome::new(set.parse_names(names.iter().copied()).expect("names"));
        Hardware::new(set, Arc::new(AppConfig::default()), &genome).expect("valid genome")
    }

    fn organism() -> IsolatedOrganism {
        IsolatedOrganism::new(3, MutationRates::default(), ViabilityRules::permissive())
    }

    #[test]
    fn test_rejects_empty_and_foreign_genomes() {
        let set = Arc::new(InstSet::standard());
        let config = Arc::new(AppConfig::default());
        assert!(Hardware::new(Arc::clone(&set), Arc::clone(&config), &Genome::default()).is_err());
        let foreign = Genome::from_bytes(&[0, 1, 200]);
        assert!(matches!(
            Hardware::new(set, config, &foreign),
            Err(VmError::InvalidGenome(_))
        ));
    }

    #[test]
    fn test_nop_only_advances_ip() {
        let mut hw = hardware(&["nop-X", "nop-A", "inc"]);
        let mut org = organism();
        let before = hw.context(0).cloned().expect("context");
        assert!(hw.single_process(&mut org));
        let after = hw.context(0).expect("context");
        assert_eq!(after.ip().position(), 1);
        assert_eq!(after.registers, before.registers);
        assert_eq!(after.stacks, before.stacks);
        assert!(hw.parent().has_flag(0, LocusFlags::EXECUTED));
    }

    #[test]
    fn test_ip_wraps() {
        let mut hw = hardware(&["nop-X", "nop-X", "nop-X"]);
        let mut org = organism();
        for _ in 0..3 {
            hw.single_process(&mut org);
        }
        assert_eq!(hw.context(0).expect("context").ip().position(), 0);
        assert_eq!(hw.cycle_count(), 3);
    }

    #[test]
    fn test_cost_gated_instruction_runs_on_third_attempt() {
        let mut inc = InstEntryConfig::named("inc");
        inc.cost = 3;
        let set = Arc::new(
            InstSet::from_config(&[InstEntryConfig::named("nop-X"), inc]).expect("valid set"),
        );
        let genome = Genome::from_bytes(&[1, 0, 0]);
        let mut hw = Hardware::new(set, Arc::new(AppConfig::default()), &genome).expect("genome");
        let mut org = organism();

        assert!(!hw.single_process(&mut org));
        assert!(!hw.single_process(&mut org));
        assert_eq!(hw.context(0).expect("context").reg_value(1), 0);
        assert_eq!(hw.context(0).expect("context").ip().position(), 0);
        assert!(hw.single_process(&mut org));
        assert_eq!(hw.context(0).expect("context").reg_value(1), 1);
        assert_eq!(hw.stats().stalls, 2);
        assert_eq!(hw.cycle_count(), 3);
    }

    #[test]
    fn test_stochastic_failure_skips_handler() {
        let mut inc = InstEntryConfig::named("inc");
        inc.prob_fail = 1.0;
        let set = Arc::new(
            InstSet::from_config(&[InstEntryConfig::named("nop-X"), inc]).expect("valid set"),
        );
        let genome = Genome::from_bytes(&[1, 0]);
        let mut hw = Hardware::new(set, Arc::new(AppConfig::default()), &genome).expect("genome");
        let mut org = organism();
        assert!(!hw.single_process(&mut org));
        let ctx = hw.context(0).expect("context");
        assert_eq!(ctx.reg_value(1), 0);
        assert_eq!(ctx.ip().position(), 1);
        assert_eq!(hw.stats().failed, 1);
    }

    #[test]
    fn test_hardware_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Hardware>();
    }
}
