use super::instruction::Instruction;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Per-locus bookkeeping bits.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(transparent)]
pub struct LocusFlags(pub u8);

impl LocusFlags {
    pub const COPIED: LocusFlags = LocusFlags(0x01);
    pub const MUTATED: LocusFlags = LocusFlags(0x02);
    pub const EXECUTED: LocusFlags = LocusFlags(0x04);
    pub const BREAKPOINT: LocusFlags = LocusFlags(0x08);
    pub const POINT_MUTATED: LocusFlags = LocusFlags(0x10);
    pub const COPY_MUTATED: LocusFlags = LocusFlags(0x20);
    pub const INJECTED: LocusFlags = LocusFlags(0x40);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: LocusFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: LocusFlags) -> Self {
        Self(self.0 | other.0)
    }

    pub fn insert(&mut self, other: LocusFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: LocusFlags) {
        self.0 &= !other.0;
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// An organism's program as a plain ordered instruction sequence.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Genome {
    pub instructions: Vec<Instruction>,
}

impl Genome {
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(bytes.iter().copied().map(Instruction).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn iter(&self) -> impl Iterator<Item = Instruction> + '_ {
        self.instructions.iter().copied()
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.instructions.iter().map(|i| i.0).collect()
    }

    /// Instruction bytes as lowercase hex, two characters per locus.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(hex_str: &str) -> anyhow::Result<Self> {
        let bytes = hex::decode(hex_str.trim())?;
        Ok(Self::from_bytes(&bytes))
    }
}

impl From<Vec<Instruction>> for Genome {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::new(instructions)
    }
}

/// A resizable instruction buffer with a parallel flag array.
///
/// `instructions` and `flags` always have the same length.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct MemorySpace {
    instructions: Vec<Instruction>,
    flags: Vec<LocusFlags>,
}

impl MemorySpace {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            instructions: Vec::new(),
            flags: Vec::new(),
        }
    }

    /// A space of `len` loci holding `fill`, all flags clear.
    #[must_use]
    pub fn filled(len: usize, fill: Instruction) -> Self {
        Self {
            instructions: vec![fill; len],
            flags: vec![LocusFlags::empty(); len],
        }
    }

    #[must_use]
    pub fn from_genome(genome: &Genome) -> Self {
        Self::from_instructions(genome.instructions.clone())
    }

    #[must_use]
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        let flags = vec![LocusFlags::empty(); instructions.len()];
        Self {
            instructions,
            flags,
        }
    }

    /// Rebuilds a space from raw parts. Returns `None` when the lengths disagree.
    #[must_use]
    pub fn from_parts(instructions: Vec<Instruction>, flags: Vec<LocusFlags>) -> Option<Self> {
        (instructions.len() == flags.len()).then_some(Self {
            instructions,
            flags,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    #[must_use]
    pub fn flag_slice(&self) -> &[LocusFlags] {
        &self.flags
    }

    /// Instruction at `pos`, or [`Instruction::ERROR`] outside the space.
    #[must_use]
    pub fn get(&self, pos: usize) -> Instruction {
        self.instructions
            .get(pos)
            .copied()
            .unwrap_or(Instruction::ERROR)
    }

    #[must_use]
    pub fn flags(&self, pos: usize) -> LocusFlags {
        self.flags.get(pos).copied().unwrap_or_default()
    }

    /// Writes `inst` at `pos` and clears the locus flags.
    ///
    /// A write at or past the end appends one locus (duplicating the last
    /// element, then overwriting it).
    pub fn set(&mut self, pos: usize, inst: Instruction) {
        if pos >= self.instructions.len() {
            let last = self.instructions.last().copied().unwrap_or(inst);
            self.instructions.push(last);
            self.flags.push(LocusFlags::empty());
            let end = self.instructions.len() - 1;
            self.instructions[end] = inst;
            return;
        }
        self.instructions[pos] = inst;
        self.flags[pos] = LocusFlags::empty();
    }

    pub fn insert(&mut self, pos: usize, inst: Instruction) {
        let pos = pos.min(self.instructions.len());
        self.instructions.insert(pos, inst);
        self.flags.insert(pos, LocusFlags::empty());
    }

    pub fn remove(&mut self, pos: usize) -> Option<Instruction> {
        if pos >= self.instructions.len() {
            return None;
        }
        self.flags.remove(pos);
        Some(self.instructions.remove(pos))
    }

    /// Grows with `fill` or truncates to `len` loci.
    pub fn resize(&mut self, len: usize, fill: Instruction) {
        self.instructions.resize(len, fill);
        self.flags.resize(len, LocusFlags::empty());
    }

    pub fn truncate(&mut self, len: usize) {
        self.instructions.truncate(len);
        self.flags.truncate(len);
    }

    pub fn clear(&mut self) {
        self.instructions.clear();
        self.flags.clear();
    }

    pub fn set_flag(&mut self, pos: usize, flag: LocusFlags) {
        if let Some(f) = self.flags.get_mut(pos) {
            f.insert(flag);
        }
    }

    pub fn clear_flag(&mut self, pos: usize, flag: LocusFlags) {
        if let Some(f) = self.flags.get_mut(pos) {
            f.remove(flag);
        }
    }

    #[must_use]
    pub fn has_flag(&self, pos: usize, flag: LocusFlags) -> bool {
        self.flags(pos).contains(flag)
    }

    /// Clears `flag` on every locus.
    pub fn clear_flag_all(&mut self, flag: LocusFlags) {
        for f in &mut self.flags {
            f.remove(flag);
        }
    }

    #[must_use]
    pub fn count_flag(&self, flag: LocusFlags) -> usize {
        self.flags.iter().filter(|f| f.contains(flag)).count()
    }

    /// Replaces the loci in `range` with `replacement`, flags cleared.
    pub fn splice(&mut self, range: std::ops::Range<usize>, replacement: &[Instruction]) {
        let end = range.end.min(self.instructions.len());
        let start = range.start.min(end);
        self.instructions
            .splice(start..end, replacement.iter().copied());
        self.flags.splice(
            start..end,
            std::iter::repeat(LocusFlags::empty()).take(replacement.len()),
        );
    }

    #[must_use]
    pub fn to_genome(&self) -> Genome {
        Genome::new(self.instructions.clone())
    }

    /// The first `len` loci as a genome.
    #[must_use]
    pub fn prefix_genome(&self, len: usize) -> Genome {
        let len = len.min(self.instructions.len());
        Genome::new(self.instructions[..len].to_vec())
    }
}
