//! Instruction registry: the closed opcode library and configured instruction sets.
//!
//! The library ([`Opcode`]) is fixed at compile time. An [`InstSet`] picks an
//! ordered subset of it; the position of an entry is the byte stored in a
//! genome. One `InstSet` is built at start-up and shared by reference with
//! every hardware instance.

use crate::config::InstEntryConfig;
use crate::error::{Result, VmError};
use evolvm_data::{BehaviorClass, Instruction};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::HashMap;

/// Number of no-op modifiers, equal to the register count.
pub const NUM_NOPS: u8 = 8;

/// Register indices selected by `nop-A`..`nop-H`.
pub const REG_AX: usize = 0;
pub const REG_BX: usize = 1;
pub const REG_CX: usize = 2;
pub const REG_DX: usize = 3;
pub const REG_EX: usize = 4;

/// Every operation the virtual CPU knows how to execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    NopA,
    NopB,
    NopC,
    NopD,
    NopE,
    NopF,
    NopG,
    NopH,
    NopX,
    Label,
    IfNEqu,
    IfLess,
    IfNotZero,
    IfEquZero,
    IfGtrZero,
    IfLessZero,
    IfGtrX,
    IfEquX,
    Pop,
    Push,
    PopAll,
    PushAll,
    SwapStk,
    SwapStkTop,
    Swap,
    ShiftR,
    ShiftL,
    Inc,
    Dec,
    Zero,
    One,
    Rand,
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Nand,
    Io,
    Input,
    Output,
    SearchLblDirectS,
    SearchLblCompF,
    SearchLblCompB,
    SearchSeqCompS,
    SearchSeqCompF,
    SearchSeqCompB,
    SearchSeqDirectS,
    SearchSeqDirectF,
    SearchSeqDirectB,
    MovHead,
    JmpHead,
    GetHead,
    IfCopiedLblComp,
    IfCopiedLblDirect,
    IfCopiedSeqComp,
    IfCopiedSeqDirect,
    Alloc,
    Copy,
    Divide,
    Repro,
    Die,
    IdThread,
    ForkThread,
    KillThread,
    StartGene,
    EndGene,
    JumpThread,
    WaitCondEqu,
    WaitCondLess,
    WaitCondGtr,
    Move,
    RotateX,
    LookAhead,
    Sense,
}

impl Opcode {
    /// The whole library in canonical order.
    pub const ALL: [Opcode; 75] = [
        Self::NopA,
        Self::NopB,
        Self::NopC,
        Self::NopD,
        Self::NopE,
        Self::NopF,
        Self::NopG,
        Self::NopH,
        Self::NopX,
        Self::Label,
        Self::IfNEqu,
        Self::IfLess,
        Self::IfNotZero,
        Self::IfEquZero,
        Self::IfGtrZero,
        Self::IfLessZero,
        Self::IfGtrX,
        Self::IfEquX,
        Self::Pop,
        Self::Push,
        Self::PopAll,
        Self::PushAll,
        Self::SwapStk,
        Self::SwapStkTop,
        Self::Swap,
        Self::ShiftR,
        Self::ShiftL,
        Self::Inc,
        Self::Dec,
        Self::Zero,
        Self::One,
        Self::Rand,
        Self::Add,
        Self::Sub,
        Self::Mult,
        Self::Div,
        Self::Mod,
        Self::Nand,
        Self::Io,
        Self::Input,
        Self::Output,
        Self::SearchLblDirectS,
        Self::SearchLblCompF,
        Self::SearchLblCompB,
        Self::SearchSeqCompS,
        Self::SearchSeqCompF,
        Self::SearchSeqCompB,
        Self::SearchSeqDirectS,
        Self::SearchSeqDirectF,
        Self::SearchSeqDirectB,
        Self::MovHead,
        Self::JmpHead,
        Self::GetHead,
        Self::IfCopiedLblComp,
        Self::IfCopiedLblDirect,
        Self::IfCopiedSeqComp,
        Self::IfCopiedSeqDirect,
        Self::Alloc,
        Self::Copy,
        Self::Divide,
        Self::Repro,
        Self::Die,
        Self::IdThread,
        Self::ForkThread,
        Self::KillThread,
        Self::StartGene,
        Self::EndGene,
        Self::JumpThread,
        Self::WaitCondEqu,
        Self::WaitCondLess,
        Self::WaitCondGtr,
        Self::Move,
        Self::RotateX,
        Self::LookAhead,
        Self::Sense,
    ];

    /// Canonical name used in instruction-set files and genome listings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NopA => "nop-A",
            Self::NopB => "nop-B",
            Self::NopC => "nop-C",
            Self::NopD => "nop-D",
            Self::NopE => "nop-E",
            Self::NopF => "nop-F",
            Self::NopG => "nop-G",
            Self::NopH => "nop-H",
            Self::NopX => "nop-X",
            Self::Label => "label",
            Self::IfNEqu => "if-n-equ",
            Self::IfLess => "if-less",
            Self::IfNotZero => "if-not-0",
            Self::IfEquZero => "if-equ-0",
            Self::IfGtrZero => "if-gtr-0",
            Self::IfLessZero => "if-less-0",
            Self::IfGtrX => "if-gtr-x",
            Self::IfEquX => "if-equ-x",
            Self::Pop => "pop",
            Self::Push => "push",
            Self::PopAll => "pop-all",
            Self::PushAll => "push-all",
            Self::SwapStk => "swap-stk",
            Self::SwapStkTop => "swap-stk-top",
            Self::Swap => "swap",
            Self::ShiftR => "shift-r",
            Self::ShiftL => "shift-l",
            Self::Inc => "inc",
            Self::Dec => "dec",
            Self::Zero => "zero",
            Self::One => "one",
            Self::Rand => "rand",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mult => "mult",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Nand => "nand",
            Self::Io => "IO",
            Self::Input => "input",
            Self::Output => "output",
            Self::SearchLblDirectS => "search-lbl-direct-s",
            Self::SearchLblCompF => "search-lbl-comp-f",
            Self::SearchLblCompB => "search-lbl-comp-b",
            Self::SearchSeqCompS => "search-seq-comp-s",
            Self::SearchSeqCompF => "search-seq-comp-f",
            Self::SearchSeqCompB => "search-seq-comp-b",
            Self::SearchSeqDirectS => "search-seq-direct-s",
            Self::SearchSeqDirectF => "search-seq-direct-f",
            Self::SearchSeqDirectB => "search-seq-direct-b",
            Self::MovHead => "mov-head",
            Self::JmpHead => "jmp-head",
            Self::GetHead => "get-head",
            Self::IfCopiedLblComp => "if-copied-lbl-comp",
            Self::IfCopiedLblDirect => "if-copied-lbl-direct",
            Self::IfCopiedSeqComp => "if-copied-seq-comp",
            Self::IfCopiedSeqDirect => "if-copied-seq-direct",
            Self::Alloc => "alloc",
            Self::Copy => "copy",
            Self::Divide => "divide",
            Self::Repro => "repro",
            Self::Die => "die",
            Self::IdThread => "id-thread",
            Self::ForkThread => "fork-thread",
            Self::KillThread => "kill-thread",
            Self::StartGene => "start-gene",
            Self::EndGene => "end-gene",
            Self::JumpThread => "jump-thread",
            Self::WaitCondEqu => "wait-cond-equ",
            Self::WaitCondLess => "wait-cond-less",
            Self::WaitCondGtr => "wait-cond-gtr",
            Self::Move => "move",
            Self::RotateX => "rotate-x",
            Self::LookAhead => "look-ahead",
            Self::Sense => "sense",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }

    #[must_use]
    pub const fn behavior(self) -> BehaviorClass {
        match self {
            Self::Input | Self::LookAhead | Self::Sense => BehaviorClass::Input,
            Self::Io | Self::Output | Self::Move | Self::RotateX => BehaviorClass::Action,
            Self::Alloc | Self::Copy | Self::Divide | Self::Repro | Self::Die => {
                BehaviorClass::Copy
            }
            Self::StartGene => BehaviorClass::StartGene,
            Self::EndGene => BehaviorClass::EndGene,
            _ => BehaviorClass::None,
        }
    }

    /// Modifier carried by a no-op, `None` for everything else (including `nop-X`).
    #[must_use]
    pub const fn nop_modifier(self) -> Option<u8> {
        match self {
            Self::NopA => Some(0),
            Self::NopB => Some(1),
            Self::NopC => Some(2),
            Self::NopD => Some(3),
            Self::NopE => Some(4),
            Self::NopF => Some(5),
            Self::NopG => Some(6),
            Self::NopH => Some(7),
            _ => None,
        }
    }

    /// Register used for the first operand when no modifier follows.
    #[must_use]
    pub const fn default_register(self) -> Option<usize> {
        match self {
            Self::JmpHead | Self::GetHead => Some(REG_CX),
            Self::WaitCondEqu | Self::WaitCondLess | Self::WaitCondGtr => Some(REG_BX),
            Self::IfNEqu
            | Self::IfLess
            | Self::IfNotZero
            | Self::IfEquZero
            | Self::IfGtrZero
            | Self::IfLessZero
            | Self::Pop
            | Self::Push
            | Self::PopAll
            | Self::PushAll
            | Self::Swap
            | Self::ShiftR
            | Self::ShiftL
            | Self::Inc
            | Self::Dec
            | Self::Zero
            | Self::One
            | Self::Rand
            | Self::Add
            | Self::Sub
            | Self::Mult
            | Self::Div
            | Self::Mod
            | Self::Nand
            | Self::Io
            | Self::Input
            | Self::Output
            | Self::IdThread
            | Self::JumpThread
            | Self::RotateX
            | Self::Sense => Some(REG_BX),
            _ => None,
        }
    }
}

/// A configured instruction: opcode plus its execution costs.
#[derive(Clone, Debug, PartialEq)]
pub struct InstEntry {
    pub opcode: Opcode,
    /// Cycles to pay before each execution; 0 and 1 execute immediately.
    pub cost: u32,
    /// Cycles paid once per organism before the first execution.
    pub first_time_cost: u32,
    /// Cycles the context stalls after a successful execution.
    pub post_cost: u32,
    /// Probability that a paid-for execution silently fails.
    pub prob_fail: f64,
    /// Relative weight for random draws.
    pub redundancy: u32,
}

/// An immutable, ordered instruction set.
#[derive(Clone, Debug)]
pub struct InstSet {
    entries: Vec<InstEntry>,
    by_name: HashMap<&'static str, Instruction>,
    weights: WeightedIndex<u32>,
}

impl InstSet {
    /// Resolves configuration entries against the opcode library.
    pub fn from_config(entries: &[InstEntryConfig]) -> Result<Self> {
        if entries.is_empty() {
            return Err(VmError::invalid_inst_set("instruction set is empty"));
        }
        if entries.len() >= usize::from(u8::MAX) {
            return Err(VmError::invalid_inst_set(format!(
                "{} entries exceed the limit of {}",
                entries.len(),
                u8::MAX - 1
            )));
        }

        let mut by_name = HashMap::with_capacity(entries.len());
        let mut resolved = Vec::with_capacity(entries.len());
        for (idx, cfg) in entries.iter().enumerate() {
            let opcode = Opcode::from_name(&cfg.name)
                .ok_or_else(|| VmError::unknown_instruction(cfg.name.as_str()))?;
            if by_name
                .insert(opcode.name(), Instruction(idx as u8))
                .is_some()
            {
                return Err(VmError::DuplicateInstruction(cfg.name.clone()));
            }
            if !(0.0..=1.0).contains(&cfg.prob_fail) {
                return Err(VmError::invalid_inst_set(format!(
                    "prob_fail of {} must be in [0.0, 1.0]",
                    cfg.name
                )));
            }
            resolved.push(InstEntry {
                opcode,
                cost: cfg.cost,
                first_time_cost: cfg.first_time_cost,
                post_cost: cfg.post_cost,
                prob_fail: cfg.prob_fail,
                redundancy: cfg.redundancy,
            });
        }

        let weights = WeightedIndex::new(resolved.iter().map(|e| e.redundancy))
            .map_err(|e| VmError::invalid_inst_set(format!("redundancy weights: {e}")))?;

        Ok(Self {
            entries: resolved,
            by_name,
            weights,
        })
    }

    /// Every library opcode once, unit costs.
    #[must_use]
    pub fn standard() -> Self {
        let entries: Vec<InstEntryConfig> = Opcode::ALL
            .iter()
            .map(|op| InstEntryConfig::named(op.name()))
            .collect();
        match Self::from_config(&entries) {
            Ok(set) => set,
            Err(e) => unreachable!("standard instruction set is valid: {e}"),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[InstEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, inst: Instruction) -> Option<&InstEntry> {
        self.entries.get(inst.index())
    }

    #[must_use]
    pub fn opcode(&self, inst: Instruction) -> Option<Opcode> {
        self.entry(inst).map(|e| e.opcode)
    }

    #[must_use]
    pub fn contains(&self, inst: Instruction) -> bool {
        inst.index() < self.entries.len()
    }

    /// Byte of a named instruction.
    #[must_use]
    pub fn instruction(&self, name: &str) -> Option<Instruction> {
        self.by_name.get(name).copied()
    }

    /// First byte mapped to `opcode`.
    #[must_use]
    pub fn instruction_for(&self, opcode: Opcode) -> Option<Instruction> {
        self.by_name.get(opcode.name()).copied()
    }

    #[must_use]
    pub fn name(&self, inst: Instruction) -> &'static str {
        self.opcode(inst).map_or("(error)", Opcode::name)
    }

    #[must_use]
    pub fn behavior(&self, inst: Instruction) -> BehaviorClass {
        self.opcode(inst).map_or(BehaviorClass::None, Opcode::behavior)
    }

    #[must_use]
    pub fn is_nop(&self, inst: Instruction) -> bool {
        self.nop_mod(inst).is_some()
    }

    #[must_use]
    pub fn nop_mod(&self, inst: Instruction) -> Option<u8> {
        self.opcode(inst).and_then(Opcode::nop_modifier)
    }

    #[must_use]
    pub fn is_label(&self, inst: Instruction) -> bool {
        self.opcode(inst) == Some(Opcode::Label)
    }

    /// Filler for freshly allocated loci: `nop-X` when present, else byte 0.
    #[must_use]
    pub fn fill_instruction(&self) -> Instruction {
        self.instruction_for(Opcode::NopX).unwrap_or_default()
    }

    /// Draws an instruction weighted by redundancy.
    pub fn random_instruction<R: Rng + ?Sized>(&self, rng: &mut R) -> Instruction {
        Instruction(self.weights.sample(rng) as u8)
    }

    /// Parses instruction names into bytes.
    pub fn parse_names<'a, I>(&self, names: I) -> Result<Vec<Instruction>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(|name| {
                self.instruction(name)
                    .ok_or_else(|| VmError::unknown_instruction(name))
            })
            .collect()
    }
}
