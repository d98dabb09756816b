//! Multi-cycle instruction costs.
//!
//! Three kinds of cost are tracked. A first-time cost is paid once per
//! organism for each instruction byte. A per-use cost is paid by the
//! executing context every time, and partial payment survives across calls
//! for as long as the context keeps fetching the same instruction. A post
//! cost stalls the context after a successful execution.
//!
//! Every attempt pays one cycle. An instruction with cost `n` stalls on
//! attempts `1..n` and executes on attempt `n`.

use crate::registry::InstSet;
use evolvm_data::Instruction;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StallReason {
    PostCost,
    FirstTime,
    Cost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CostOutcome {
    Ready,
    Stalled(StallReason),
}

impl CostOutcome {
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PendingCost {
    inst: Option<Instruction>,
    paid: u32,
    post: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CostLedger {
    first_time: Vec<u32>,
    pending: Vec<PendingCost>,
}

impl CostLedger {
    #[must_use]
    pub fn new(inst_set: &InstSet) -> Self {
        Self {
            first_time: inst_set
                .entries()
                .iter()
                .map(|e| e.first_time_cost)
                .collect(),
            pending: Vec::new(),
        }
    }

    /// Forgets all partial payments and re-arms first-time costs.
    pub fn reset(&mut self, inst_set: &InstSet) {
        *self = Self::new(inst_set);
    }

    fn slot(&mut self, ctx: usize) -> &mut PendingCost {
        if self.pending.len() <= ctx {
            self.pending.resize(ctx + 1, PendingCost::default());
        }
        &mut self.pending[ctx]
    }

    /// Pays one cycle toward a pending post cost. Returns `true` while the
    /// context is still stalled.
    pub fn pay_post(&mut self, ctx: usize) -> bool {
        let slot = self.slot(ctx);
        if slot.post == 0 {
            return false;
        }
        slot.post -= 1;
        true
    }

    /// Pays one cycle toward executing `inst` on context `ctx`.
    pub fn pay(&mut self, ctx: usize, inst: Instruction, inst_set: &InstSet) -> CostOutcome {
        let Some(entry) = inst_set.entry(inst) else {
            return CostOutcome::Ready;
        };

        if let Some(remaining) = self.first_time.get_mut(inst.index()) {
            if *remaining > 1 {
                *remaining -= 1;
                return CostOutcome::Stalled(StallReason::FirstTime);
            }
            *remaining = 0;
        }

        if entry.cost <= 1 {
            return CostOutcome::Ready;
        }

        let slot = self.slot(ctx);
        if slot.inst != Some(inst) {
            slot.inst = Some(inst);
            slot.paid = 0;
        }
        slot.paid += 1;
        if slot.paid < entry.cost {
            return CostOutcome::Stalled(StallReason::Cost);
        }
        slot.inst = None;
        slot.paid = 0;
        CostOutcome::Ready
    }

    /// Arms the post cost of an instruction that just executed.
    pub fn set_post(&mut self, ctx: usize, post_cost: u32) {
        if post_cost > 1 {
            self.slot(ctx).post = post_cost - 1;
        }
    }

    /// Cycles already paid toward the pending instruction of `ctx`.
    #[must_use]
    pub fn paid(&self, ctx: usize) -> u32 {
        self.pending.get(ctx).map_or(0, |p| p.paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstEntryConfig;

    fn costed(cost: u32, first: u32, post: u32) -> InstSet {
        let mut inc = InstEntryConfig::named("inc");
        inc.cost = cost;
        inc.first_time_cost = first;
        inc.post_cost = post;
        InstSet::from_config(&[InstEntryConfig::named("nop-A"), inc]).expect("valid set")
    }

    #[test]
    fn test_three_cycle_cost_executes_on_third_attempt() {
        let set = costed(3, 0, 0);
        let mut ledger = CostLedger::new(&set);
        let inc = Instruction(1);
        assert_eq!(ledger.pay(0, inc, &set), CostOutcome::Stalled(StallReason::Cost));
        assert_eq!(ledger.paid(0), 1);
        assert_eq!(ledger.pay(0, inc, &set), CostOutcome::Stalled(StallReason::Cost));
        assert_eq!(ledger.pay(0, inc, &set), CostOutcome::Ready);
        assert_eq!(ledger.paid(0), 0);
    }

    #[test]
    fn test_unit_cost_never_stalls() {
        let set = costed(1, 0, 0);
        let mut ledger = CostLedger::new(&set);
        assert!(ledger.pay(0, Instruction(0), &set).is_ready());
        assert!(ledger.pay(0, Instruction(1), &set).is_ready());
    }

    #[test]
    fn test_payment_is_per_context() {
        let set = costed(2, 0, 0);
        let mut ledger = CostLedger::new(&set);
        let inc = Instruction(1);
        assert!(!ledger.pay(0, inc, &set).is_ready());
        assert!(!ledger.pay(1, inc, &set).is_ready());
        assert!(ledger.pay(0, inc, &set).is_ready());
        assert!(ledger.pay(1, inc, &set).is_ready());
    }

    #[test]
    fn test_first_time_cost_paid_once() {
        let set = costed(1, 3, 0);
        let mut ledger = CostLedger::new(&set);
        let inc = Instruction(1);
        assert_eq!(
            ledger.pay(0, inc, &set),
            CostOutcome::Stalled(StallReason::FirstTime)
        );
        assert!(!ledger.pay(1, inc, &set).is_ready());
        assert!(ledger.pay(0, inc, &set).is_ready());
        assert!(ledger.pay(0, inc, &set).is_ready());

        ledger.reset(&set);
        assert!(!ledger.pay(0, inc, &set).is_ready());
    }

    #[test]
    fn test_post_cost_stalls_after_execution() {
        let set = costed(1, 0, 3);
        let mut ledger = CostLedger::new(&set);
        assert!(!ledger.pay_post(0));
        ledger.set_post(0, 3);
        assert!(ledger.pay_post(0));
        assert!(ledger.pay_post(0));
        assert!(!ledger.pay_post(0));
    }
}
