//! Thread lifecycle, waits and the register-write wake-up cascade.

use super::Hardware;
use crate::context::{Comparator, ContextStatus, WaitCondition};
use crate::head::HeadKind;
use crate::organism::{FaultKind, Organism, TraceEvent};
use crate::registry::{REG_BX, REG_DX};
use evolvm_data::Register;

impl Hardware {
    /// Writes `value` into register `reg` of context `writer`, then wakes
    /// every sibling whose wait condition the write satisfies. A woken
    /// sibling receives the value in its destination register, which may in
    /// turn satisfy further waiters.
    pub(super) fn write_register(&mut self, writer: usize, reg: usize, value: Register) {
        let Some(context) = self.contexts.get_mut(writer) else {
            return;
        };
        context.registers[reg] = value;

        let mut pending = vec![(writer, reg, value)];
        while let Some((source, reg, value)) = pending.pop() {
            for idx in 0..self.contexts.len() {
                if idx == source {
                    continue;
                }
                let ContextStatus::Waiting(cond) = self.contexts[idx].status else {
                    continue;
                };
                if !cond.satisfied_by(reg, value.value) {
                    continue;
                }
                let woken = Register::derived(value.value, self.cycle_count, &value);
                let target = &mut self.contexts[idx];
                target.status = ContextStatus::Active;
                target.registers[cond.destination] = woken;
                tracing::debug!(context = target.id, register = reg, "Woke waiting thread");
                pending.push((idx, cond.destination, woken));
            }
        }
    }

    /// `wait-cond-*`: block until a sibling's register satisfies the
    /// comparison against this context's threshold register.
    pub(super) fn inst_wait(&mut self, comparator: Comparator) -> bool {
        let wait_val_reg = self.find_modified_register(REG_BX);
        let check_reg = self.find_modified_register(REG_DX);
        let destination = self.find_modified_register(wait_val_reg);
        let threshold = self.reg(wait_val_reg).value;

        let satisfied = self
            .contexts
            .iter()
            .enumerate()
            .filter(|(idx, c)| *idx != self.cur && !c.status.is_cancelled())
            .map(|(_, c)| *c.reg(check_reg))
            .find(|r| comparator.holds(r.value, threshold));
        if let Some(found) = satisfied {
            let value = Register::derived(found.value, self.cycle_count, &found);
            self.set_reg(destination, value);
            return true;
        }

        if self.active_count() <= 1 {
            return false;
        }

        let cur = self.cur;
        self.contexts[cur].status = ContextStatus::Waiting(WaitCondition {
            register: check_reg,
            comparator,
            threshold,
            destination,
        });
        tracing::debug!(context = self.contexts[cur].id, "Thread waiting");
        true
    }

    pub(super) fn inst_fork_thread(&mut self, org: &mut dyn Organism) -> bool {
        if self.contexts.len() >= self.config.hardware.max_threads {
            self.fault(org, FaultKind::ThreadLimit, "fork-thread: thread limit reached");
            return false;
        }
        let cur = self.cur;
        let mut child = self.contexts[cur].clone();
        child.id = self.next_thread_id;
        self.next_thread_id += 1;
        child.status = ContextStatus::Active;
        child.head_mut(HeadKind::Ip).advance();
        let (parent_id, child_id) = (self.contexts[cur].id, child.id);
        self.contexts.push(child);
        let idx = self.contexts.len() - 1;
        self.adjust_head(idx, HeadKind::Ip);

        tracing::debug!(parent = parent_id, child = child_id, "Forked thread");
        org.trace(&TraceEvent::ThreadForked {
            parent: parent_id,
            child: child_id,
        });
        true
    }

    /// Cancels the current context unless it is the last active one.
    pub(super) fn inst_kill_thread(&mut self, org: &mut dyn Organism) -> bool {
        if self.active_count() <= 1 {
            return false;
        }
        let cur = self.cur;
        self.contexts[cur].status = ContextStatus::Cancelled;
        let id = self.contexts[cur].id;
        tracing::debug!(context = id, "Killed thread");
        org.trace(&TraceEvent::ThreadKilled { context: id });
        true
    }

    /// Cancels context `idx` from outside, with the same last-active rule.
    pub fn kill_context(&mut self, idx: usize) -> bool {
        if idx >= self.contexts.len()
            || !self.contexts[idx].status.is_active()
            || self.active_count() <= 1
        {
            return false;
        }
        self.contexts[idx].status = ContextStatus::Cancelled;
        true
    }

    pub(super) fn inst_id_thread(&mut self) -> bool {
        let reg = self.find_modified_register(REG_BX);
        let id = self.contexts[self.cur].id;
        self.set_reg(reg, Register::constant(id as i32, self.cycle_count));
        true
    }

    /// Hands the next slot to context `|BX| % count`, waking it if needed.
    pub(super) fn inst_jump_thread(&mut self) -> bool {
        let reg = self.find_modified_register(REG_BX);
        let target = self.reg(reg).value.unsigned_abs() as usize % self.contexts.len();
        match self.contexts[target].status {
            ContextStatus::Cancelled => false,
            ContextStatus::Waiting(_) => {
                self.contexts[target].status = ContextStatus::Active;
                self.next_context = Some(target);
                true
            }
            ContextStatus::Active => {
                self.next_context = Some(target);
                true
            }
        }
    }
}
