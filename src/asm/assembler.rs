//! Simple assembler for core programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//!         BANK 0      ; select bank, position resets to poly 0
//! START:              ; record a label
//!         LAI  $F     ; A := F
//!         ADI  1      ; A := A + 1, skip next on carry
//!         SKEI 10     ; skip next if A = 10
//!         LBLI 0x5    ; BL := 5
//!         NOP
//!         ORG  $3F    ; continue at poly position 3F
//!         DB   $FF    ; raw byte
//! ```
//!
//! Successive statements occupy successive *polynomial* addresses, not
//! successive integers.

use crate::bits::{poly_next, Address, Nibble};
use crate::cpu::decode::{encode, Instruction};
use std::collections::HashMap;
use thiserror::Error;

/// An assembled ROM image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// The ROM image, unused bytes zero.
    pub image: Vec<u8>,
    /// Label addresses.
    pub symbols: HashMap<String, Address>,
}

/// Assemble source code into a ROM image of `size` bytes.
pub fn assemble(source: &str, size: usize) -> Result<Program, AssemblerError> {
    let mut asm = Assembler::new(size);
    for (line_num, line) in source.lines().enumerate() {
        asm.process_line(line, line_num + 1)?;
    }
    Ok(Program { image: asm.image, symbols: asm.symbols })
}

/// The assembler state.
struct Assembler {
    /// Current bank and poly position.
    bank: u8,
    poly: u8,
    symbols: HashMap<String, Address>,
    image: Vec<u8>,
    used: Vec<bool>,
}

impl Assembler {
    fn new(size: usize) -> Self {
        Self {
            bank: 0,
            poly: 0,
            symbols: HashMap::new(),
            image: vec![0; size],
            used: vec![false; size],
        }
    }

    fn current(&self) -> Address {
        Address::from_parts(self.bank, self.poly)
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        // Check for label definition
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if !label.is_empty() {
                let here = self.current();
                if self.symbols.insert(label.clone(), here).is_some() {
                    return Err(AssemblerError::DuplicateLabel { line: line_num, label });
                }
            }
            let rest = line[colon_idx + 1..].trim();
            if !rest.is_empty() {
                return self.process_statement(rest, line_num);
            }
            return Ok(());
        }

        self.process_statement(line, line_num)
    }

    fn process_statement(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() > 2 {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("unexpected `{}`", parts[2]),
            });
        }

        let mnemonic = parts[0].to_uppercase();
        let operand = parts.get(1).copied();

        match mnemonic.as_str() {
            // Directives
            "BANK" => {
                let bank = self.required(operand, &mnemonic, line_num)?;
                if bank >= Address::BANKS as u32 {
                    return Err(AssemblerError::ValueOutOfRange { line: line_num, value: bank });
                }
                self.bank = bank as u8;
                self.poly = 0;
            }

            "ORG" => {
                let poly = self.required(operand, &mnemonic, line_num)?;
                if poly > 0x7F {
                    return Err(AssemblerError::ValueOutOfRange { line: line_num, value: poly });
                }
                self.poly = poly as u8;
            }

            "DB" => {
                let value = self.required(operand, &mnemonic, line_num)?;
                if value > 0xFF {
                    return Err(AssemblerError::ValueOutOfRange { line: line_num, value });
                }
                self.emit(value as u8, line_num)?;
            }

            "NOP" => {
                if operand.is_some() {
                    return Err(AssemblerError::SyntaxError {
                        line: line_num,
                        message: "NOP takes no operand".into(),
                    });
                }
                self.emit(encode(&Instruction::AddImmediate(Nibble::zero())), line_num)?;
            }

            // Instructions
            _ => {
                let imm = self.required(operand, &mnemonic, line_num)?;
                if imm > Nibble::MASK as u32 {
                    return Err(AssemblerError::ValueOutOfRange { line: line_num, value: imm });
                }
                let imm = Nibble::new(imm as u8);
                let instr = match mnemonic.as_str() {
                    "ADI" => Instruction::AddImmediate(imm),
                    "SKEI" => Instruction::SkipIfEqual(imm),
                    "LBLI" => Instruction::LoadBl(imm),
                    "LAI" => Instruction::LoadA(imm),
                    _ => return Err(AssemblerError::UnknownMnemonic {
                        line: line_num,
                        mnemonic,
                    }),
                };
                self.emit(encode(&instr), line_num)?;
            }
        }

        Ok(())
    }

    fn required(&self, operand: Option<&str>, mnemonic: &str, line_num: usize) -> Result<u32, AssemblerError> {
        let operand = operand.ok_or_else(|| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("{} requires an operand", mnemonic),
        })?;
        parse_number(operand).ok_or_else(|| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid number `{}`", operand),
        })
    }

    fn emit(&mut self, byte: u8, line_num: usize) -> Result<(), AssemblerError> {
        let addr = self.current();
        let index = addr.value() as usize;
        if index >= self.image.len() {
            return Err(AssemblerError::OutsideImage { line: line_num, addr });
        }
        if self.used[index] {
            return Err(AssemblerError::AddressReused { line: line_num, addr });
        }
        self.image[index] = byte;
        self.used[index] = true;
        self.poly = poly_next(self.poly);
        Ok(())
    }
}

/// Parse `15`, `$F` or `0xF`.
fn parse_number(text: &str) -> Option<u32> {
    if let Some(hex) = text.strip_prefix('$') {
        return u32::from_str_radix(hex, 16).ok();
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    text.parse().ok()
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: u32 },

    #[error("address {addr} on line {line} already holds code (bank full or overlapping ORG)")]
    AddressReused { line: usize, addr: Address },

    #[error("address {addr} on line {line} is outside the ROM image")]
    OutsideImage { line: usize, addr: Address },
}
