//! Heads: cursors into a memory space.
//!
//! A head stores the space it is bound to and a signed raw position. The
//! hardware owns the spaces, so normalization takes the bound length as an
//! argument rather than a reference to the space.

/// Names one memory space inside a hardware instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpaceId {
    /// The running program.
    Parent,
    /// The offspring under construction.
    Offspring,
    /// The code space of gene `n` under behavior-classed scheduling.
    Gene(usize),
}

/// Head roles. The discriminant is the modifier that selects the head.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeadKind {
    Ip = 0,
    Read = 1,
    Write = 2,
    Flow = 3,
}

impl HeadKind {
    pub const COUNT: usize = 4;

    /// Modifiers beyond the last head clamp to FLOW.
    #[must_use]
    pub const fn from_modifier(modifier: u8) -> Self {
        match modifier {
            0 => Self::Ip,
            1 => Self::Read,
            2 => Self::Write,
            _ => Self::Flow,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Wraps `pos` into `[0, extent)`; an empty extent maps everything to 0.
#[must_use]
pub fn wrap(pos: i64, extent: usize) -> usize {
    if extent == 0 {
        return 0;
    }
    pos.rem_euclid(extent as i64) as usize
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Head {
    space: SpaceId,
    pos: i64,
}

impl Head {
    #[must_use]
    pub const fn new(space: SpaceId) -> Self {
        Self { space, pos: 0 }
    }

    #[must_use]
    pub const fn at(space: SpaceId, pos: usize) -> Self {
        Self {
            space,
            pos: pos as i64,
        }
    }

    #[must_use]
    pub const fn space(&self) -> SpaceId {
        self.space
    }

    /// Position as last normalized. Negative raw positions read as 0 until
    /// the hardware adjusts the head.
    #[must_use]
    pub fn position(&self) -> usize {
        usize::try_from(self.pos).unwrap_or(0)
    }

    #[must_use]
    pub const fn raw(&self) -> i64 {
        self.pos
    }

    pub fn set(&mut self, pos: i64) {
        self.pos = pos;
    }

    pub fn rebind(&mut self, space: SpaceId, pos: i64) {
        self.space = space;
        self.pos = pos;
    }

    pub fn advance(&mut self) {
        self.pos = self.pos.saturating_add(1);
    }

    pub fn jump(&mut self, offset: i64) {
        self.pos = self.pos.saturating_add(offset);
    }

    /// Brings the position into `[0, extent)`.
    pub fn normalize(&mut self, extent: usize) {
        self.pos = wrap(self.pos, extent) as i64;
    }

    /// Advance then wrap.
    pub fn step(&mut self, extent: usize) {
        self.advance();
        self.normalize(extent);
    }
}
