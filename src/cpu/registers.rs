//! Core registers.
//!
//! The register file is small:
//! - A: 4-bit accumulator
//! - X: 4-bit general register
//! - B: 6-bit RAM pointer (BH:BL)
//! - C: carry flag
//! - W: 5-bit ALU working value, live only inside an arithmetic instruction
//!
//! The 4-deep return stack sits alongside it.

use crate::bits::{Address, Nibble, Pointer, Working};
use serde::{Serialize, Deserialize};

/// Depth of the return-address stack.
pub const STACK_DEPTH: usize = 4;

/// The register file.
///
/// Only the execute stage writes these, and only when entering a phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// A: accumulator
    pub a: Nibble,

    /// X: general purpose
    pub x: Nibble,

    /// B: RAM pointer
    pub b: Pointer,

    /// Carry flag
    pub carry: bool,

    /// ALU working value (nibble plus carry-out bit)
    pub working: Working,
}

impl Registers {
    /// Create a register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Load BL, leaving BH alone.
    pub fn set_bl(&mut self, bl: Nibble) {
        self.b = self.b.with_bl(bl);
    }
}

/// Return-address stack.
///
/// Pushing onto a full stack drops the deepest entry; popping shifts the
/// remaining entries up and refills the bottom with zero. No decoded
/// instruction reaches it yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnStack {
    slots: [Address; STACK_DEPTH],
}

impl ReturnStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a return address.
    pub fn push(&mut self, addr: Address) {
        self.slots.copy_within(0..STACK_DEPTH - 1, 1);
        self.slots[0] = addr;
    }

    /// Pop the most recent return address.
    pub fn pop(&mut self) -> Address {
        let top = self.slots[0];
        self.slots.copy_within(1..STACK_DEPTH, 0);
        self.slots[STACK_DEPTH - 1] = Address::zero();
        top
    }

    /// Current top without popping.
    pub fn peek(&self) -> Address {
        self.slots[0]
    }

    /// All entries, top first.
    pub fn slots(&self) -> &[Address; STACK_DEPTH] {
        &self.slots
    }

    pub fn clear(&mut self) {
        self.slots = [Address::zero(); STACK_DEPTH];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_everything() {
        let mut regs = Registers {
            a: Nibble::new(0xA),
            x: Nibble::new(0x3),
            b: Pointer::new(0x2F),
            carry: true,
            working: Working::new(0x1C),
        };
        regs.reset();
        assert_eq!(regs, Registers::new());
    }

    #[test]
    fn test_set_bl_keeps_bh() {
        let mut regs = Registers::new();
        regs.b = Pointer::from_parts(2, Nibble::new(0x1));
        regs.set_bl(Nibble::new(0x5));
        assert_eq!(regs.b.bh(), 2);
        assert_eq!(regs.b.bl().value(), 0x5);
    }

    #[test]
    fn test_stack_push_pop_order() {
        let mut stack = ReturnStack::new();
        stack.push(Address::new(0x040));
        stack.push(Address::new(0x160));
        assert_eq!(stack.peek().value(), 0x160);
        assert_eq!(stack.pop().value(), 0x160);
        assert_eq!(stack.pop().value(), 0x040);
        assert_eq!(stack.pop().value(), 0x000);
    }

    #[test]
    fn test_stack_overflow_drops_deepest() {
        let mut stack = ReturnStack::new();
        for addr in 1..=5u16 {
            stack.push(Address::new(addr));
        }
        let values: Vec<u16> = stack.slots().iter().map(|a| a.value()).collect();
        assert_eq!(values, vec![5, 4, 3, 2]);

        stack.clear();
        assert_eq!(stack, ReturnStack::new());
    }
}
