//! Instruction handlers.
//!
//! [`Hardware::execute`] is the single dispatch point. Handlers return
//! `true` on success; a `false` is counted as a failed execution and never
//! unwinds state the handler already changed.

use super::Hardware;
use crate::context::{Comparator, NUM_REGISTERS};
use crate::head::HeadKind;
use crate::label::{find_label, find_nop_sequence, SearchDirection};
use crate::organism::{FaultKind, Organism, SensorQuery};
use crate::registry::{Opcode, NUM_NOPS, REG_AX, REG_BX, REG_CX, REG_DX, REG_EX};
use evolvm_data::Register;
use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SearchKind {
    Label,
    Sequence,
}

impl Hardware {
    pub(super) fn execute(&mut self, org: &mut dyn Organism, op: Opcode) -> bool {
        match op {
            Opcode::NopA
            | Opcode::NopB
            | Opcode::NopC
            | Opcode::NopD
            | Opcode::NopE
            | Opcode::NopF
            | Opcode::NopG
            | Opcode::NopH
            | Opcode::NopX
            | Opcode::Label
            | Opcode::StartGene
            | Opcode::EndGene => true,

            Opcode::IfNEqu => self.inst_if_pair(|a, b| a != b),
            Opcode::IfLess => self.inst_if_pair(|a, b| a < b),
            Opcode::IfNotZero => self.inst_if_single(|v| v != 0),
            Opcode::IfEquZero => self.inst_if_single(|v| v == 0),
            Opcode::IfGtrZero => self.inst_if_single(|v| v > 0),
            Opcode::IfLessZero => self.inst_if_single(|v| v < 0),
            Opcode::IfGtrX => self.inst_if_label_constant(|bx, x| bx > x),
            Opcode::IfEquX => self.inst_if_label_constant(|bx, x| bx == x),

            Opcode::Pop => self.inst_pop(),
            Opcode::Push => self.inst_push(),
            Opcode::PopAll => self.inst_pop_all(),
            Opcode::PushAll => self.inst_push_all(),
            Opcode::SwapStk => {
                self.contexts[self.cur].switch_stack();
                true
            }
            Opcode::SwapStkTop => self.inst_swap_stack_tops(),
            Opcode::Swap => self.inst_swap(),

            Opcode::ShiftR => self.inst_unary(|v| v >> 1),
            Opcode::ShiftL => self.inst_unary(|v| v.wrapping_shl(1)),
            Opcode::Inc => self.inst_unary(|v| v.wrapping_add(1)),
            Opcode::Dec => self.inst_unary(|v| v.wrapping_sub(1)),
            Opcode::Zero => self.inst_constant(0),
            Opcode::One => self.inst_constant(1),
            Opcode::Rand => {
                let rng = org.rng();
                let magnitude = rng.gen_range(0..i32::MAX);
                let value = if rng.gen_bool(0.5) { -magnitude } else { magnitude };
                self.inst_constant(value)
            }
            Opcode::Add => self.inst_binary(|a, b| Some(a.wrapping_add(b))),
            Opcode::Sub => self.inst_binary(|a, b| Some(a.wrapping_sub(b))),
            Opcode::Mult => self.inst_binary(|a, b| Some(a.wrapping_mul(b))),
            Opcode::Nand => self.inst_binary(|a, b| Some(!(a & b))),
            Opcode::Div => {
                let ok = self.inst_binary(|a, b| (b != 0).then(|| a.wrapping_div(b)));
                if !ok {
                    self.fault(org, FaultKind::Arithmetic, "div: dividing by 0");
                }
                ok
            }
            Opcode::Mod => {
                let ok = self.inst_binary(|a, b| (b != 0).then(|| a.wrapping_rem(b)));
                if !ok {
                    self.fault(org, FaultKind::Arithmetic, "mod: modding by 0");
                }
                ok
            }

            Opcode::Io => {
                let reg = self.find_modified_register(REG_BX);
                org.do_output(self.reg(reg).value);
                self.read_input(org, reg);
                true
            }
            Opcode::Input => {
                let reg = self.find_modified_register(REG_BX);
                self.read_input(org, reg);
                true
            }
            Opcode::Output => {
                let reg = self.find_modified_register(REG_BX);
                org.do_output(self.reg(reg).value);
                true
            }

            Opcode::SearchLblDirectS => {
                self.inst_search(SearchKind::Label, false, SearchDirection::Start)
            }
            Opcode::SearchLblCompF => {
                self.inst_search(SearchKind::Label, true, SearchDirection::Forward)
            }
            Opcode::SearchLblCompB => {
                self.inst_search(SearchKind::Label, true, SearchDirection::Backward)
            }
            Opcode::SearchSeqCompS => {
                self.inst_search(SearchKind::Sequence, true, SearchDirection::Start)
            }
            Opcode::SearchSeqCompF => {
                self.inst_search(SearchKind::Sequence, true, SearchDirection::Forward)
            }
            Opcode::SearchSeqCompB => {
                self.inst_search(SearchKind::Sequence, true, SearchDirection::Backward)
            }
            Opcode::SearchSeqDirectS => {
                self.inst_search(SearchKind::Sequence, false, SearchDirection::Start)
            }
            Opcode::SearchSeqDirectF => {
                self.inst_search(SearchKind::Sequence, false, SearchDirection::Forward)
            }
            Opcode::SearchSeqDirectB => {
                self.inst_search(SearchKind::Sequence, false, SearchDirection::Backward)
            }

            Opcode::MovHead => self.inst_mov_head(),
            Opcode::JmpHead => self.inst_jmp_head(),
            Opcode::GetHead => self.inst_get_head(),

            Opcode::IfCopiedLblComp => self.inst_if_copied(true, false),
            Opcode::IfCopiedLblDirect => self.inst_if_copied(false, false),
            Opcode::IfCopiedSeqComp => self.inst_if_copied(true, true),
            Opcode::IfCopiedSeqDirect => self.inst_if_copied(false, true),

            Opcode::Alloc => self.inst_alloc(org),
            Opcode::Copy => self.inst_copy(org),
            Opcode::Divide => self.inst_divide(org),
            Opcode::Repro => self.inst_repro(org),
            Opcode::Die => {
                self.to_die = true;
                true
            }

            Opcode::IdThread => self.inst_id_thread(),
            Opcode::ForkThread => self.inst_fork_thread(org),
            Opcode::KillThread => self.inst_kill_thread(org),
            Opcode::JumpThread => self.inst_jump_thread(),
            Opcode::WaitCondEqu => self.inst_wait(Comparator::Equal),
            Opcode::WaitCondLess => self.inst_wait(Comparator::Less),
            Opcode::WaitCondGtr => self.inst_wait(Comparator::Greater),

            Opcode::Move => org.do_move(),
            Opcode::RotateX => {
                let reg = self.find_modified_register(REG_BX);
                let value = self.reg(reg).value;
                let amount = (value.unsigned_abs() % 8) as i32 * value.signum();
                org.do_rotate(amount)
            }
            Opcode::LookAhead => self.inst_look_ahead(org),
            Opcode::Sense => self.inst_sense(org),
        }
    }

    // ---- conditionals ---------------------------------------------------

    /// Runs the next instruction only when `cond(op1, op2)` holds.
    fn inst_if_pair(&mut self, cond: impl Fn(i32, i32) -> bool) -> bool {
        let op1 = self.find_modified_register(REG_BX);
        let op2 = self.find_modified_next_register(op1);
        if !cond(self.reg(op1).value, self.reg(op2).value) {
            self.skip_next();
        }
        true
    }

    fn inst_if_single(&mut self, cond: impl Fn(i32) -> bool) -> bool {
        let reg = self.find_modified_register(REG_BX);
        if !cond(self.reg(reg).value) {
            self.skip_next();
        }
        true
    }

    /// Compares `BX` with a constant spelled by the following label: start
    /// from 1, `nop-A` negates, any other modifier shifts left by itself.
    fn inst_if_label_constant(&mut self, cond: impl Fn(i32, i32) -> bool) -> bool {
        let label = self.read_label();
        let constant = label.as_slice().iter().fold(1i32, |acc, &nop| match nop {
            0 => acc.wrapping_neg(),
            n => acc.wrapping_shl(u32::from(n)),
        });
        if !cond(self.reg(REG_BX).value, constant) {
            self.skip_next();
        }
        true
    }

    // ---- stacks ---------------------------------------------------------

    fn inst_pop(&mut self) -> bool {
        let reg = self.find_modified_register(REG_BX);
        let popped = self.contexts[self.cur].stack_mut().pop();
        self.set_reg(reg, Register::derived(popped.value, self.cycle_count, &popped));
        true
    }

    fn inst_push(&mut self) -> bool {
        let reg = self.find_modified_register(REG_BX);
        let value = self.reg(reg);
        self.contexts[self.cur].stack_mut().push(value);
        true
    }

    fn inst_push_all(&mut self) -> bool {
        let start = self.find_modified_register(REG_BX);
        for offset in 0..NUM_REGISTERS {
            let value = self.reg((start + offset) % NUM_REGISTERS);
            self.contexts[self.cur].stack_mut().push(value);
        }
        true
    }

    /// Inverse of `push-all`: the last register pushed is restored first.
    fn inst_pop_all(&mut self) -> bool {
        let start = self.find_modified_register(REG_BX);
        for offset in (0..NUM_REGISTERS).rev() {
            let popped = self.contexts[self.cur].stack_mut().pop();
            let value = Register::derived(popped.value, self.cycle_count, &popped);
            self.set_reg((start + offset) % NUM_REGISTERS, value);
        }
        true
    }

    fn inst_swap_stack_tops(&mut self) -> bool {
        let [first, second] = &mut self.contexts[self.cur].stacks;
        let a = first.pop();
        let b = second.pop();
        first.push(b);
        second.push(a);
        true
    }

    fn inst_swap(&mut self) -> bool {
        let op1 = self.find_modified_register(REG_BX);
        let op2 = self.find_modified_next_register(op1);
        let (a, b) = (self.reg(op1), self.reg(op2));
        self.set_reg(op1, b);
        self.set_reg(op2, a);
        true
    }

    // ---- arithmetic -----------------------------------------------------

    fn inst_unary(&mut self, f: impl Fn(i32) -> i32) -> bool {
        let reg = self.find_modified_register(REG_BX);
        let source = self.reg(reg);
        self.set_reg(reg, Register::derived(f(source.value), self.cycle_count, &source));
        true
    }

    fn inst_constant(&mut self, value: i32) -> bool {
        let reg = self.find_modified_register(REG_BX);
        self.set_reg(reg, Register::constant(value, self.cycle_count));
        true
    }

    /// `dst = f(op1, op2)`; `None` from `f` leaves `dst` alone and fails.
    fn inst_binary(&mut self, f: impl Fn(i32, i32) -> Option<i32>) -> bool {
        let dst = self.find_modified_register(REG_BX);
        let op1 = self.find_modified_register(dst);
        let op2 = self.find_modified_next_register(op1);
        let (a, b) = (self.reg(op1), self.reg(op2));
        match f(a.value, b.value) {
            Some(result) => {
                self.set_reg(dst, Register::combined(result, self.cycle_count, &a, &b));
                true
            }
            None => false,
        }
    }

    // ---- input and sensing ----------------------------------------------

    fn read_input(&mut self, org: &mut dyn Organism, reg: usize) {
        let value = org.next_input();
        org.do_input(value);
        self.set_reg(reg, Register::sensed(value, self.cycle_count));
    }

    fn sensor_query(&self) -> SensorQuery {
        SensorQuery {
            habitat: self.reg(REG_AX).value,
            distance: self.reg(REG_BX).value,
            search_type: self.reg(REG_CX).value,
            id: self.reg(REG_DX).value,
        }
    }

    fn inst_look_ahead(&mut self, org: &mut dyn Organism) -> bool {
        let query = self.sensor_query();
        let Some(reading) = org.sensor().map(|sensor| sensor.query(&query)) else {
            self.fault(org, FaultKind::MissingSensor, "look-ahead: no sensor attached");
            return false;
        };
        let cycle = self.cycle_count;
        self.set_reg(REG_BX, Register::sensed(reading.distance, cycle));
        self.set_reg(REG_CX, Register::sensed(reading.count, cycle));
        self.set_reg(REG_DX, Register::sensed(reading.value, cycle));
        self.set_reg(REG_EX, Register::sensed(reading.group, cycle));
        true
    }

    fn inst_sense(&mut self, org: &mut dyn Organism) -> bool {
        let reg = self.find_modified_register(REG_BX);
        let query = self.sensor_query();
        let Some(reading) = org.sensor().map(|sensor| sensor.query(&query)) else {
            self.fault(org, FaultKind::MissingSensor, "sense: no sensor attached");
            return false;
        };
        self.set_reg(reg, Register::sensed(reading.value, self.cycle_count));
        true
    }

    // ---- searches and heads ---------------------------------------------

    /// Places FLOW after the match of the following label and reports the
    /// distance in `BX` and the key size in `CX`. A miss leaves FLOW just
    /// after the label.
    fn inst_search(&mut self, kind: SearchKind, complement: bool, direction: SearchDirection) -> bool {
        let mut key = self.read_label();
        if complement {
            key = key.complement(NUM_NOPS);
        }
        let ctx = self.cur;
        let (space, ip) = self.head_location(ctx, HeadKind::Ip);
        let memory = self.memory(space);
        let len = memory.len();
        let found = match kind {
            SearchKind::Label => find_label(memory, &self.inst_set, &key, direction, ip),
            SearchKind::Sequence => find_nop_sequence(memory, &self.inst_set, &key, direction, ip),
        };

        let Some(hit) = found else {
            self.set_head_to_head(ctx, HeadKind::Flow, HeadKind::Ip);
            self.advance_head(ctx, HeadKind::Flow);
            return true;
        };

        let marker = usize::from(kind == SearchKind::Label);
        let marked = hit.matched.min(self.config.hardware.max_label_exe_size) + marker;
        for offset in 0..marked {
            self.mark_executed(space, (hit.start + offset) % len);
        }

        self.contexts[ctx]
            .head_mut(HeadKind::Flow)
            .rebind(space, hit.position as i64);
        self.adjust_head(ctx, HeadKind::Flow);

        let cycle = self.cycle_count;
        let distance = hit.distance_from(ip, len) as i32;
        self.set_reg(REG_BX, Register::constant(distance, cycle));
        self.set_reg(REG_CX, Register::constant(key.len() as i32, cycle));
        true
    }

    fn inst_mov_head(&mut self) -> bool {
        let head = self.find_modified_head(HeadKind::Ip);
        let target = self.find_modified_head(HeadKind::Flow);
        self.set_head_to_head(self.cur, head, target);
        if head == HeadKind::Ip {
            self.advance_ip = false;
        }
        true
    }

    fn inst_jmp_head(&mut self) -> bool {
        let head = self.find_modified_head(HeadKind::Ip);
        let reg = self.find_modified_register(REG_CX);
        let offset = i64::from(self.reg(reg).value);
        let ctx = self.cur;
        self.contexts[ctx].head_mut(head).jump(offset);
        self.adjust_head(ctx, head);
        if head == HeadKind::Ip {
            self.advance_ip = false;
        }
        true
    }

    fn inst_get_head(&mut self) -> bool {
        let head = self.find_modified_head(HeadKind::Ip);
        let reg = self.find_modified_register(REG_CX);
        let ctx = self.cur;
        self.adjust_head(ctx, head);
        let position = self.contexts[ctx].head(head).position() as i32;
        self.set_reg(reg, Register::constant(position, self.cycle_count));
        true
    }

    /// Until the end of the program has been copied, skips the next
    /// instruction unless the last copied label (or no-op run) equals the
    /// following label.
    fn inst_if_copied(&mut self, complement: bool, sequence: bool) -> bool {
        let mut label = self.read_label();
        if complement {
            label = label.complement(NUM_NOPS);
        }
        if self.has_copied_end {
            return true;
        }
        let ctx = &self.contexts[self.cur];
        let copied = if sequence { &ctx.read_seq } else { &ctx.read_label };
        if *copied == label {
            self.has_copied_end = true;
        } else {
            self.skip_next();
        }
        true
    }
}
