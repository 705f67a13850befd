//! Program counter unit.
//!
//! The low 7 bits advance along the polynomial cycle; the upper 3 bits
//! select a bank and are only changed by an absolute load or by reset.

use crate::bits::{poly_next, Address};
use serde::{Serialize, Deserialize};

/// Requests raised by the execute stage for the current clock edge.
///
/// A load wins over an increment when both are raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PcControl {
    pub increment: bool,
    pub load: Option<Address>,
}

impl PcControl {
    /// Hold the current value.
    pub const HOLD: Self = Self { increment: false, load: None };

    /// Take one polynomial step.
    pub const INCREMENT: Self = Self { increment: true, load: None };

    /// Replace the counter with `target`.
    pub const fn load(target: Address) -> Self {
        Self { increment: false, load: Some(target) }
    }
}

/// The 10-bit program counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramCounter {
    addr: Address,
}

impl ProgramCounter {
    /// Start at poly 0 of `bank`.
    pub fn new(bank: u8) -> Self {
        Self { addr: Address::from_parts(bank, 0) }
    }

    /// Current address.
    #[inline]
    pub fn get(&self) -> Address {
        self.addr
    }

    /// Return to poly 0 of `bank`.
    pub fn reset(&mut self, bank: u8) {
        self.addr = Address::from_parts(bank, 0);
    }

    /// Apply one clock edge.
    pub fn clock(&mut self, control: PcControl) {
        if let Some(target) = control.load {
            self.addr = target;
        } else if control.increment {
            self.addr = Address::from_parts(self.addr.bank(), poly_next(self.addr.poly()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold() {
        let mut pc = ProgramCounter::new(0);
        pc.clock(PcControl::HOLD);
        assert_eq!(pc.get().value(), 0);
    }

    #[test]
    fn test_increment_follows_polynomial() {
        let mut pc = ProgramCounter::new(0);
        let mut visited = Vec::new();
        for _ in 0..4 {
            pc.clock(PcControl::INCREMENT);
            visited.push(pc.get().value());
        }
        assert_eq!(visited, vec![0x40, 0x60, 0x70, 0x78]);
    }

    #[test]
    fn test_increment_keeps_bank() {
        let mut pc = ProgramCounter::new(3);
        for _ in 0..200 {
            pc.clock(PcControl::INCREMENT);
            assert_eq!(pc.get().bank(), 3);
        }
    }

    #[test]
    fn test_load_has_priority() {
        let mut pc = ProgramCounter::new(0);
        pc.clock(PcControl { increment: true, load: Some(Address::new(0x2A5)) });
        assert_eq!(pc.get().value(), 0x2A5);

        pc.clock(PcControl::load(Address::new(0x011)));
        assert_eq!(pc.get().value(), 0x011);
    }

    #[test]
    fn test_reset_uses_bank() {
        let mut pc = ProgramCounter::new(0);
        pc.clock(PcControl::load(Address::new(0x1FF)));
        pc.reset(2);
        assert_eq!(pc.get(), Address::from_parts(2, 0));
    }
}
