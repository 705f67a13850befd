//! TUI debugger for the core.
//!
//! Provides an interactive terminal-based debugger with:
//! - Phase-by-phase and instruction stepping
//! - Register, skip and serial pin view
//! - RAM view and a rolling step trace
//! - Disassembly in execution (polynomial) order with breakpoints

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
