//! Execution contexts: per-thread heads, registers and stacks.

use crate::head::{Head, HeadKind, SpaceId};
use evolvm_data::{CodeLabel, Register};
use std::collections::VecDeque;

pub const NUM_REGISTERS: usize = 8;
pub const STACK_SIZE: usize = 10;
pub const NUM_STACKS: usize = 2;

/// Bounded LIFO of register values.
///
/// Pushing onto a full stack drops the oldest entry; popping an empty stack
/// yields a zero register.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stack {
    values: VecDeque<Register>,
}

impl Stack {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: VecDeque::with_capacity(STACK_SIZE),
        }
    }

    pub fn push(&mut self, value: Register) {
        if self.values.len() == STACK_SIZE {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn pop(&mut self) -> Register {
        self.values.pop_back().unwrap_or_default()
    }

    #[must_use]
    pub fn top(&self) -> Register {
        self.values.back().copied().unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    Less,
    Greater,
}

impl Comparator {
    /// `value <op> threshold`.
    #[must_use]
    pub const fn holds(self, value: i32, threshold: i32) -> bool {
        match self {
            Self::Equal => value == threshold,
            Self::Less => value < threshold,
            Self::Greater => value > threshold,
        }
    }
}

/// What a waiting context is blocked on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitCondition {
    /// Register (in any sibling context) whose writes are watched.
    pub register: usize,
    pub comparator: Comparator,
    pub threshold: i32,
    /// Own register that receives the satisfying value on wake-up.
    pub destination: usize,
}

impl WaitCondition {
    #[must_use]
    pub const fn satisfied_by(&self, register: usize, value: i32) -> bool {
        self.register == register && self.comparator.holds(value, self.threshold)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextStatus {
    Active,
    Waiting(WaitCondition),
    Cancelled,
}

impl ContextStatus {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// One cooperatively scheduled thread of execution.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecContext {
    pub id: u32,
    pub heads: [Head; HeadKind::COUNT],
    pub registers: [Register; NUM_REGISTERS],
    pub stacks: [Stack; NUM_STACKS],
    pub cur_stack: usize,
    pub status: ContextStatus,
    /// Gene this context runs, under behavior-classed scheduling.
    pub gene: Option<usize>,
    /// Label most recently read after the IP.
    pub label: CodeLabel,
    /// Label the read head most recently copied past.
    pub read_label: CodeLabel,
    /// Nop run the read head most recently copied past.
    pub read_seq: CodeLabel,
    pub reading_label: bool,
    pub reading_seq: bool,
}

impl ExecContext {
    /// A fresh context whose IP and FLOW run `code`.
    #[must_use]
    pub fn new(id: u32, code: SpaceId) -> Self {
        Self {
            id,
            heads: [
                Head::new(code),
                Head::new(SpaceId::Parent),
                Head::new(SpaceId::Offspring),
                Head::new(code),
            ],
            registers: [Register::default(); NUM_REGISTERS],
            stacks: [Stack::new(), Stack::new()],
            cur_stack: 0,
            status: ContextStatus::Active,
            gene: match code {
                SpaceId::Gene(n) => Some(n),
                _ => None,
            },
            label: CodeLabel::new(),
            read_label: CodeLabel::new(),
            read_seq: CodeLabel::new(),
            reading_label: false,
            reading_seq: false,
        }
    }

    /// Space IP and FLOW are bound to.
    #[must_use]
    pub fn code_space(&self) -> SpaceId {
        self.gene.map_or(SpaceId::Parent, SpaceId::Gene)
    }

    #[must_use]
    pub fn head(&self, kind: HeadKind) -> &Head {
        &self.heads[kind.index()]
    }

    pub fn head_mut(&mut self, kind: HeadKind) -> &mut Head {
        &mut self.heads[kind.index()]
    }

    #[must_use]
    pub fn ip(&self) -> &Head {
        self.head(HeadKind::Ip)
    }

    #[must_use]
    pub fn reg(&self, idx: usize) -> &Register {
        &self.registers[idx % NUM_REGISTERS]
    }

    #[must_use]
    pub fn reg_value(&self, idx: usize) -> i32 {
        self.reg(idx).value
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stacks[self.cur_stack]
    }

    pub fn switch_stack(&mut self) {
        self.cur_stack = (self.cur_stack + 1) % NUM_STACKS;
    }

    /// Heads back to the start of their spaces, registers zeroed, stacks
    /// emptied. The status and gene binding survive.
    pub fn reset(&mut self) {
        let fresh = Self::new(self.id, self.code_space());
        let status = self.status;
        *self = fresh;
        self.status = status;
    }
}
