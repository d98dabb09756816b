//! Per-call scheduling of execution contexts.

use super::{Attempt, Hardware};
use crate::config::{SchedulingPolicy, ThreadSlicing};
use crate::head::HeadKind;
use crate::organism::Organism;
use evolvm_data::BehaviorClass;

impl Hardware {
    /// Runs one call's worth of execution for the organism.
    ///
    /// Returns the number of attempts made. A `die` executed during the
    /// call, or reaching `max_executed`, is reported to the organism after
    /// the call completes.
    pub fn step(&mut self, org: &mut dyn Organism) -> u32 {
        org.set_running(true);
        let attempts = match self.config.scheduler.policy {
            SchedulingPolicy::RoundRobin => self.step_round_robin(org),
            SchedulingPolicy::BehaviorClassed => self.step_behavior_classed(org),
        };
        org.set_running(false);

        let max_executed = self.config.hardware.max_executed;
        if self.to_die || (max_executed > 0 && self.cycle_count >= max_executed) {
            tracing::debug!(cycles = self.cycle_count, "Organism terminated");
            org.die();
        }
        attempts
    }

    /// First active context at or after `from`, wrapping.
    fn next_active_from(&self, from: usize) -> Option<usize> {
        let count = self.contexts.len();
        (0..count)
            .map(|step| (from + step) % count)
            .find(|&idx| self.contexts[idx].status.is_active())
    }

    fn following_context(&mut self) -> usize {
        let count = self.contexts.len().max(1);
        match self.next_context.take() {
            Some(target) if target < count => target,
            _ => (self.cur + 1) % count,
        }
    }

    fn step_round_robin(&mut self, org: &mut dyn Organism) -> u32 {
        let mut attempts = 0;
        for _ in 0..self.config.scheduler.micro_ops_per_call {
            let slot = match self.config.scheduler.slicing {
                ThreadSlicing::PerContext => self.active_count(),
                ThreadSlicing::Shared => 1,
            };
            for _ in 0..slot {
                let Some(ctx) = self.next_active_from(self.cur) else {
                    return attempts;
                };
                self.cur = ctx;
                self.attempt(org);
                attempts += 1;
                self.cur = self.following_context();
            }
        }
        attempts
    }

    /// Visits contexts from the first, allowing one executed instruction
    /// per throttled class per call. A context whose next instruction needs
    /// a class already used sits out the rest of the call.
    fn step_behavior_classed(&mut self, org: &mut dyn Organism) -> u32 {
        self.cur = 0;
        self.next_context = None;
        self.used_classes = [false; BehaviorClass::THROTTLED];

        let cap = self.config.scheduler.max_exec_per_call;
        let mut blocked = vec![false; self.contexts.len()];
        let mut attempts = 0;

        while attempts < cap && !self.used_classes.iter().all(|used| *used) {
            let count = self.contexts.len();
            if count == 0 {
                break;
            }
            blocked.resize(count, false);
            let Some(ctx) = (0..count)
                .map(|step| (self.cur + step) % count)
                .find(|&idx| !blocked[idx] && self.contexts[idx].status.is_active())
            else {
                break;
            };
            self.cur = ctx;

            self.adjust_head(ctx, HeadKind::Ip);
            let (space, pos) = self.head_location(ctx, HeadKind::Ip);
            let slot = self.inst_set.behavior(self.memory(space).get(pos)).slot();
            if slot.is_some_and(|slot| self.used_classes[slot]) {
                blocked[ctx] = true;
                self.cur = (ctx + 1) % count;
                continue;
            }

            let attempt = self.attempt(org);
            attempts += 1;
            if let (Some(slot), Attempt::Executed { .. }) = (slot, attempt) {
                self.used_classes[slot] = true;
            }
            self.cur = self.following_context();
        }
        attempts
    }
}

#[cfg(test)]
mod tests {
    use super::super::Hardware;
    use crate::config::{AppConfig, MutationRates, SchedulerConfig, SchedulingPolicy};
    use crate::divide::ViabilityRules;
    use crate::isolated::IsolatedOrganism;
    use crate::organism::Organism;
    use crate::registry::InstSet;
    use evolvm_data::Genome;
    use std::sync::Arc;

    fn classed(names: &[&str]) -> Hardware {
        let set = Arc::new(InstSet::standard());
        let config = AppConfig {
            scheduler: SchedulerConfig {
                policy: SchedulingPolicy::BehaviorClassed,
                ..Default::default()
            },
            ..Default::default()
        };
        let genome = Genome::new(set.parse_names(names.iter().copied()).expect("names"));
        Hardware::new(set, Arc::new(config), &genome).expect("genome")
    }

    #[test]
    fn test_one_instruction_per_class_per_call() {
        let mut hw = classed(&["input", "input", "input", "inc"]);
        let mut org = IsolatedOrganism::new(1, MutationRates::default(), ViabilityRules::permissive());
        let attempts = hw.step(&mut org);
        assert_eq!(attempts, 1);
        assert_eq!(hw.context(0).expect("gene context").ip().position(), 1);
    }

    #[test]
    fn test_unthrottled_instructions_hit_the_cap() {
        let mut hw = classed(&["inc", "inc", "dec", "inc"]);
        let mut org = IsolatedOrganism::new(1, MutationRates::default(), ViabilityRules::permissive());
        assert_eq!(hw.step(&mut org), 20);
    }

    #[test]
    fn test_die_is_deferred_to_end_of_call() {
        let set = Arc::new(InstSet::standard());
        let config = AppConfig {
            scheduler: SchedulerConfig {
                micro_ops_per_call: 3,
                ..Default::default()
            },
            ..Default::default()
        };
        let genome = Genome::new(set.parse_names(["die", "inc", "inc"]).expect("names"));
        let mut hw = Hardware::new(set, Arc::new(config), &genome).expect("genome");
        let mut org = IsolatedOrganism::new(1, MutationRates::default(), ViabilityRules::permissive());
        assert_eq!(hw.step(&mut org), 3);
        assert_eq!(hw.context(0).expect("context").reg_value(1), 2);
        assert!(!org.is_alive());
        assert!(!org.is_running());
    }
}
