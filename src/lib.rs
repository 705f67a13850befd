//! # CIC Emulator
//!
//! A phase-accurate emulator of the 4-bit lock-step authentication
//! microcontroller found in cartridge consoles.
//!
//! Two identical cores run the same ROM, one in the console and one in the
//! cartridge, exchanging single-bit serial data. Any difference in their
//! state means the pair has fallen out of step. This crate models one core
//! exactly enough that two instances fed the same inputs stay identical.

pub mod bits;
pub mod cpu;
pub mod asm;
pub mod lockstep;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use bits::{Address, Nibble, Pointer, Working};
pub use cpu::{Cpu, CpuConfig, ConfigError, Ram, Rom, RomBus, Instruction, Phase, Snapshot, StepEvent, StepRecord};
pub use asm::{assemble, disassemble, parse_listing, AssemblerError, ImageError, load_image, load_program, save_image};
pub use lockstep::{Divergence, LockStep};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
