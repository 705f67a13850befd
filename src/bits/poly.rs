//! Polynomial program counter arithmetic.
//!
//! The low 7 bits of the program counter do not count, they shift: bits
//! 6..1 move down one place and the new bit 6 is `1` when bit 1 equals
//! bit 0. Starting anywhere except the lock-up value `0x7F`, this visits
//! 127 distinct addresses before repeating.

/// Mask of the polynomial field of the program counter.
pub const POLY_MASK: u8 = 0x7F;

/// Number of distinct values on the main polynomial cycle.
pub const POLY_PERIOD: usize = 127;

/// The single value that maps onto itself.
pub const LOCKUP: u8 = 0x7F;

/// Successor of a 7-bit polynomial counter value.
#[inline]
pub const fn poly_next(value: u8) -> u8 {
    let value = value & POLY_MASK;
    let feedback = ((value >> 1) ^ value) & 1 == 0;
    (value >> 1) | ((feedback as u8) << 6)
}

/// Predecessor of a 7-bit polynomial counter value.
///
/// Exact inverse of [`poly_next`] over all 128 values.
#[inline]
pub const fn poly_prev(value: u8) -> u8 {
    let value = value & POLY_MASK;
    let bit1 = value & 1;
    let bit0 = if value & 0x40 != 0 { bit1 } else { bit1 ^ 1 };
    ((value << 1) & 0x7E) | bit0
}

/// Iterator over one lap of the polynomial cycle.
///
/// Yields `start` first and stops before `start` would repeat.
#[derive(Debug, Clone)]
pub struct PolySequence {
    start: u8,
    current: Option<u8>,
}

impl PolySequence {
    /// Walk the cycle containing `start`.
    pub fn new(start: u8) -> Self {
        let start = start & POLY_MASK;
        Self { start, current: Some(start) }
    }
}

impl Iterator for PolySequence {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let value = self.current?;
        let next = poly_next(value);
        self.current = if next == self.start { None } else { Some(next) };
        Some(value)
    }
}
