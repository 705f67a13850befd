//! Program tooling around the core.
//!
//! This module provides:
//! - An assembler (text → ROM image in polynomial order)
//! - A disassembler (ROM image → text in execution order)
//! - A listing reader (disassembly text → ROM image)
//! - ROM image file I/O

pub mod assembler;
pub mod disasm;
pub mod listing;
pub mod image;

pub use assembler::{assemble, AssemblerError, Program};
pub use disasm::disassemble;
pub use listing::{parse_listing, ListingError};
pub use image::{load_image, load_program, save_image, ImageError};
