//! Masked fixed-width register values.
//!
//! Constructors truncate to the register width the way a hardware latch
//! does. `TryFrom<u8>`/`TryFrom<u16>` reject out-of-range values instead,
//! and are what deserialization goes through.

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::bits::poly::{poly_next, poly_prev, POLY_MASK};

/// A value did not fit the register it was meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("value {value:#x} does not fit in {width} bits")]
pub struct WidthError {
    pub value: u16,
    pub width: u32,
}

// ============================================================================
// Nibble
// ============================================================================

/// A 4-bit value.
///
/// Used for the accumulator, the X register, the low half of B,
/// instruction immediates and RAM cells.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Nibble(u8);

impl Nibble {
    /// Number of bits.
    pub const WIDTH: u32 = 4;

    /// Mask applied on every write.
    pub const MASK: u8 = 0x0F;

    /// Largest representable value.
    pub const MAX: Self = Self(0x0F);

    /// The zero nibble.
    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Create from the low 4 bits of `value`.
    #[inline]
    pub const fn new(value: u8) -> Self {
        Self(value & Self::MASK)
    }

    /// Raw value (always `<= 0xF`).
    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Test a single bit (0 = LSB).
    #[inline]
    pub const fn bit(self, index: u32) -> bool {
        (self.0 >> index) & 1 != 0
    }

    /// Zero-extend into a 5-bit working value.
    #[inline]
    pub const fn widen(self) -> Working {
        Working(self.0)
    }
}

impl TryFrom<u8> for Nibble {
    type Error = WidthError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MASK {
            return Err(WidthError { value: value as u16, width: Self::WIDTH });
        }
        Ok(Self(value))
    }
}

impl From<Nibble> for u8 {
    fn from(n: Nibble) -> u8 {
        n.0
    }
}

impl fmt::Debug for Nibble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nibble({:X})", self.0)
    }
}

impl fmt::Display for Nibble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

// ============================================================================
// Working
// ============================================================================

/// The 5-bit ALU working value.
///
/// Holds a zero-extended nibble during an arithmetic instruction so the
/// carry-out (bit 4) can be tested before the result is folded back into
/// the 4-bit accumulator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Working(u8);

impl Working {
    /// Number of bits.
    pub const WIDTH: u32 = 5;

    /// Mask applied on every write.
    pub const MASK: u8 = 0x1F;

    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Create from the low 5 bits of `value`.
    #[inline]
    pub const fn new(value: u8) -> Self {
        Self(value & Self::MASK)
    }

    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Add a zero-extended nibble, truncating to 5 bits.
    #[inline]
    pub const fn wrapping_add(self, rhs: Nibble) -> Self {
        Self::new(self.0 + rhs.value())
    }

    /// Bit 4, the carry out of the low nibble.
    #[inline]
    pub const fn carry_out(self) -> bool {
        self.0 & 0x10 != 0
    }

    /// The low nibble, as committed to the accumulator.
    #[inline]
    pub const fn low(self) -> Nibble {
        Nibble::new(self.0)
    }
}

impl TryFrom<u8> for Working {
    type Error = WidthError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MASK {
            return Err(WidthError { value: value as u16, width: Self::WIDTH });
        }
        Ok(Self(value))
    }
}

impl From<Working> for u8 {
    fn from(w: Working) -> u8 {
        w.0
    }
}

impl fmt::Debug for Working {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Working({:02X})", self.0)
    }
}

impl fmt::Display for Working {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

// ============================================================================
// Pointer
// ============================================================================

/// The 6-bit B register: BH in bits 5..4, BL in bits 3..0.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Pointer(u8);

impl Pointer {
    pub const WIDTH: u32 = 6;
    pub const MASK: u8 = 0x3F;

    /// Mask selecting the RAM cell addressed by B.
    pub const RAM_MASK: u8 = 0x1F;

    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Create from the low 6 bits of `value`.
    #[inline]
    pub const fn new(value: u8) -> Self {
        Self(value & Self::MASK)
    }

    /// Build from separate BH (2 bits) and BL (4 bits) fields.
    #[inline]
    pub const fn from_parts(bh: u8, bl: Nibble) -> Self {
        Self(((bh & 0x03) << 4) | bl.value())
    }

    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// High field, 2 bits.
    #[inline]
    pub const fn bh(self) -> u8 {
        self.0 >> 4
    }

    /// Low field, 4 bits.
    #[inline]
    pub const fn bl(self) -> Nibble {
        Nibble::new(self.0)
    }

    /// Replace BL, keeping BH.
    #[inline]
    pub const fn with_bl(self, bl: Nibble) -> Self {
        Self((self.0 & 0x30) | bl.value())
    }

    /// Replace BH, keeping BL.
    #[inline]
    pub const fn with_bh(self, bh: u8) -> Self {
        Self::from_parts(bh, self.bl())
    }

    /// RAM cell index addressed by B (BL plus the low bit of BH).
    #[inline]
    pub const fn ram_address(self) -> u8 {
        self.0 & Self::RAM_MASK
    }
}

impl TryFrom<u8> for Pointer {
    type Error = WidthError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MASK {
            return Err(WidthError { value: value as u16, width: Self::WIDTH });
        }
        Ok(Self(value))
    }
}

impl From<Pointer> for u8 {
    fn from(p: Pointer) -> u8 {
        p.0
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pointer(BH={}, BL={:X})", self.bh(), self.bl().value())
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:X}", self.bh(), self.bl().value())
    }
}

// ============================================================================
// Address
// ============================================================================

/// A 10-bit program address: bank in bits 9..7, polynomial field in 6..0.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Address(u16);

impl Address {
    pub const WIDTH: u32 = 10;
    pub const MASK: u16 = 0x3FF;

    /// Number of banks addressable by the upper 3 bits.
    pub const BANKS: u8 = 8;

    /// Addresses per bank.
    pub const BANK_SIZE: usize = 128;

    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Create from the low 10 bits of `value`.
    #[inline]
    pub const fn new(value: u16) -> Self {
        Self(value & Self::MASK)
    }

    /// Build from a bank (3 bits) and polynomial field (7 bits).
    #[inline]
    pub const fn from_parts(bank: u8, poly: u8) -> Self {
        Self((((bank & 0x07) as u16) << 7) | (poly & POLY_MASK) as u16)
    }

    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Upper 3 bits.
    #[inline]
    pub const fn bank(self) -> u8 {
        (self.0 >> 7) as u8
    }

    /// Low 7 bits.
    #[inline]
    pub const fn poly(self) -> u8 {
        (self.0 as u8) & POLY_MASK
    }

    /// Polynomial successor within the same bank.
    #[inline]
    pub const fn next(self) -> Self {
        Self::from_parts(self.bank(), poly_next(self.poly()))
    }

    /// Polynomial predecessor within the same bank.
    #[inline]
    pub const fn prev(self) -> Self {
        Self::from_parts(self.bank(), poly_prev(self.poly()))
    }
}

impl TryFrom<u16> for Address {
    type Error = WidthError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if value > Self::MASK {
            return Err(WidthError { value, width: Self::WIDTH });
        }
        Ok(Self(value))
    }
}

impl From<Address> for u16 {
    fn from(a: Address) -> u16 {
        a.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:03X})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03X}", self.0)
    }
}
