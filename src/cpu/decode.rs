//! Instruction decoder.
//!
//! An opcode is one byte: the high nibble selects the operation class,
//! the low nibble is the immediate operand. Decoding is total: every one
//! of the 256 byte values maps to an instruction.

use crate::bits::Nibble;
use serde::{Serialize, Deserialize};

/// Operation class, the high nibble of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpClass {
    AddImmediate,
    SkipIfEqual,
    LoadBl,
    LoadA,
    /// Any class without defined behavior (0x4..=0xF).
    Reserved(u8),
}

impl OpClass {
    /// Class of an opcode byte.
    pub const fn of(opcode: u8) -> Self {
        match opcode >> 4 {
            Opcode::ADI => OpClass::AddImmediate,
            Opcode::SKEI => OpClass::SkipIfEqual,
            Opcode::LBLI => OpClass::LoadBl,
            Opcode::LAI => OpClass::LoadA,
            other => OpClass::Reserved(other),
        }
    }
}

/// Decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    /// A := A + imm, skip next on carry out
    AddImmediate(Nibble),

    /// Skip next if A = imm
    SkipIfEqual(Nibble),

    /// BL := imm
    LoadBl(Nibble),

    /// A := imm
    LoadA(Nibble),

    /// Reserved class. Consumed as a no-op that skips the next instruction.
    Illegal(u8),
}

/// Class numbers (high nibble).
struct Opcode;

impl Opcode {
    const ADI: u8 = 0x0;
    const SKEI: u8 = 0x1;
    const LBLI: u8 = 0x2;
    const LAI: u8 = 0x3;
}

/// The opcode substituted for a skipped instruction.
pub const NOP: u8 = 0x00;

impl Instruction {
    /// Operation class.
    pub fn class(&self) -> OpClass {
        OpClass::of(encode(self))
    }

    /// True for reserved/illegal opcodes.
    pub fn is_illegal(&self) -> bool {
        matches!(self, Instruction::Illegal(_))
    }

    /// Assembly mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::AddImmediate(n) if n.value() == 0 => "NOP",
            Instruction::AddImmediate(_) => "ADI",
            Instruction::SkipIfEqual(_) => "SKEI",
            Instruction::LoadBl(_) => "LBLI",
            Instruction::LoadA(_) => "LAI",
            Instruction::Illegal(_) => "DB",
        }
    }
}

/// Decode an opcode byte.
pub fn decode(opcode: u8) -> Instruction {
    let imm = Nibble::new(opcode);
    match OpClass::of(opcode) {
        OpClass::AddImmediate => Instruction::AddImmediate(imm),
        OpClass::SkipIfEqual => Instruction::SkipIfEqual(imm),
        OpClass::LoadBl => Instruction::LoadBl(imm),
        OpClass::LoadA => Instruction::LoadA(imm),
        OpClass::Reserved(_) => Instruction::Illegal(opcode),
    }
}

/// Encode an instruction back to its opcode byte.
pub fn encode(instr: &Instruction) -> u8 {
    let (class, imm) = match instr {
        Instruction::AddImmediate(n) => (Opcode::ADI, n.value()),
        Instruction::SkipIfEqual(n) => (Opcode::SKEI, n.value()),
        Instruction::LoadBl(n) => (Opcode::LBLI, n.value()),
        Instruction::LoadA(n) => (Opcode::LAI, n.value()),
        Instruction::Illegal(byte) => return *byte,
    };
    (class << 4) | imm
}
