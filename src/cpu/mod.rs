//! The 4-bit core.
//!
//! This module implements the execution engine:
//! - ROM addressed by a 10-bit polynomial program counter, 32×4 RAM
//! - Registers A, X, B (BH:BL), carry, and a 5-bit ALU working value
//! - A four-phase cycle (Load, Read, Modify, Write) per instruction
//! - Skip-based conditional execution

pub mod memory;
pub mod registers;
pub mod pc;
pub mod phase;
pub mod decode;
pub mod execute;

pub use memory::{Ram, RamAccess, Rom, RomBus, RomFn, MemoryError};
pub use registers::{Registers, ReturnStack};
pub use pc::{PcControl, ProgramCounter};
pub use phase::{CycleState, Phase};
pub use decode::{Instruction, OpClass};
pub use execute::{ConfigError, Cpu, CpuConfig, SkipCause, Snapshot, StepEvent, StepRecord};
