//! Disassembler for ROM images.
//!
//! Banks are walked in polynomial order, the order the core executes
//! them. Each line has the form `AAA: OP  MNEMONIC`, which the listing
//! reader accepts back.

use crate::bits::{Address, PolySequence};
use crate::cpu::decode::{decode, Instruction};

/// Disassemble a single opcode byte to text.
pub fn disassemble_instruction(opcode: u8) -> String {
    format_instruction(&decode(opcode))
}

/// Disassemble one bank of a ROM image in execution order.
///
/// Covers the 127 addresses reachable from poly 0. Banks outside the
/// image produce an empty string.
pub fn disassemble_bank(image: &[u8], bank: u8) -> String {
    let mut output = String::new();
    for poly in PolySequence::new(0) {
        let addr = Address::from_parts(bank, poly);
        let Some(&byte) = image.get(addr.value() as usize) else {
            break;
        };
        output.push_str(&format_line(addr, byte));
        output.push('\n');
    }
    output
}

/// Disassemble every bank of a ROM image.
pub fn disassemble(image: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; Disassembly\n");
    output.push_str("; -----------\n");

    let banks = image.len() / Address::BANK_SIZE;
    for bank in 0..banks as u8 {
        output.push_str(&format!("\n; bank {}\n", bank));
        output.push_str(&disassemble_bank(image, bank));
    }

    output
}

/// One listing line.
pub fn format_line(addr: Address, opcode: u8) -> String {
    format!("{}: {:02X}    {}", addr, opcode, disassemble_instruction(opcode))
}

/// Format a decoded instruction as assembly text.
fn format_instruction(instr: &Instruction) -> String {
    match instr {
        Instruction::AddImmediate(n) if n.value() == 0 => "NOP".to_string(),
        Instruction::AddImmediate(n) => format!("ADI  ${}", n),
        Instruction::SkipIfEqual(n) => format!("SKEI ${}", n),
        Instruction::LoadBl(n) => format!("LBLI ${}", n),
        Instruction::LoadA(n) => format!("LAI  ${}", n),
        Instruction::Illegal(byte) => format!("DB   ${:02X}  ; illegal", byte),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disassemble_instruction() {
        assert_eq!(disassemble_instruction(0x00), "NOP");
        assert_eq!(disassemble_instruction(0x07), "ADI  $7");
        assert_eq!(disassemble_instruction(0x1A), "SKEI $A");
        assert_eq!(disassemble_instruction(0x25), "LBLI $5");
        assert_eq!(disassemble_instruction(0x3F), "LAI  $F");
        assert!(disassemble_instruction(0x9C).contains("illegal"));
    }

    #[test]
    fn test_bank_in_execution_order() {
        let mut image = vec![0u8; 512];
        image[0x000] = 0x3F;
        image[0x040] = 0x01;
        let text = disassemble_bank(&image, 0);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 127);
        assert_eq!(lines[0], "000: 3F    LAI  $F");
        assert_eq!(lines[1], "040: 01    ADI  $1");
        assert!(lines[2].starts_with("060: 00"));
    }

    #[test]
    fn test_whole_image() {
        let image = vec![0u8; 768];
        let text = disassemble(&image);
        assert!(text.contains("; bank 5"));
        assert!(!text.contains("; bank 6"));
        assert_eq!(disassemble_bank(&image, 7), "");
    }
}
