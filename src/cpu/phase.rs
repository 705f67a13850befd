//! The four-phase instruction cycle.

use std::fmt;
use serde::{Serialize, Deserialize};

/// One quarter of an instruction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// ROM is addressed by the PC; the opcode is latched as the phase ends.
    Load,
    /// Operands are staged into the working value.
    Read,
    /// The ALU operation settles.
    Modify,
    /// Results are committed and the PC is advanced.
    Write,
}

impl Phase {
    /// All phases in cycle order.
    pub const ALL: [Phase; 4] = [Phase::Load, Phase::Read, Phase::Modify, Phase::Write];

    /// The phase that follows this one.
    pub const fn next(self) -> Self {
        match self {
            Phase::Load => Phase::Read,
            Phase::Read => Phase::Modify,
            Phase::Modify => Phase::Write,
            Phase::Write => Phase::Load,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Phase::Load => "LOAD",
            Phase::Read => "READ",
            Phase::Modify => "MODIFY",
            Phase::Write => "WRITE",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Current phase plus the one being entered on the next edge.
///
/// The execute stage keys its actions on `upcoming`, so the PC and the
/// opcode latch see the effects of a phase on the same edge that enters it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleState {
    current: Phase,
    upcoming: Phase,
}

impl CycleState {
    /// The reset state: in Load, about to enter Read.
    pub const fn new() -> Self {
        Self { current: Phase::Load, upcoming: Phase::Read }
    }

    #[inline]
    pub fn current(&self) -> Phase {
        self.current
    }

    #[inline]
    pub fn upcoming(&self) -> Phase {
        self.upcoming
    }

    /// Enter the upcoming phase.
    pub fn advance(&mut self) {
        self.current = self.upcoming;
        self.upcoming = self.upcoming.next();
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for CycleState {
    fn default() -> Self {
        Self::new()
    }
}
