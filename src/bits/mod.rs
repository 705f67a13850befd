//! Fixed-width register values and polynomial counter arithmetic.
//!
//! The core never relies on host word overflow. Every register is a
//! distinct type that masks to its hardware width on construction:
//! - [`Nibble`] - 4-bit accumulator, X, BL, immediates and RAM cells
//! - [`Working`] - 5-bit ALU working value (nibble plus carry-out)
//! - [`Pointer`] - 6-bit B register (2-bit BH, 4-bit BL)
//! - [`Address`] - 10-bit program counter (3-bit bank, 7-bit polynomial field)

mod word;
pub mod poly;

pub use word::{Address, Nibble, Pointer, WidthError, Working};
pub use poly::{poly_next, poly_prev, PolySequence};
