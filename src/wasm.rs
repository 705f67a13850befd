//! WebAssembly bindings for the emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core.

use wasm_bindgen::prelude::*;
use crate::{Cpu, CpuConfig, Rom};
use crate::asm::assembler::assemble;
use crate::asm::disasm::disassemble_instruction;
use crate::asm::listing::{parse_listing, LISTING_IMAGE_SIZE};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_err<E: std::fmt::Display>(e: E) -> JsError {
    JsError::new(&e.to_string())
}

/// WebAssembly-friendly core wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    config: CpuConfig,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a core over a blank ROM, already reset.
    #[wasm_bindgen(constructor)]
    pub fn new(reset_bank: u8) -> Result<WasmCpu, JsError> {
        let config = CpuConfig { reset_bank };
        let cpu = build(vec![0; LISTING_IMAGE_SIZE], config)?;
        Ok(Self { cpu, config })
    }

    /// Load a raw ROM image (512, 768 or 1024 bytes) and reset.
    #[wasm_bindgen]
    pub fn load_image(&mut self, image: &js_sys::Uint8Array) -> Result<(), JsError> {
        self.cpu = build(image.to_vec(), self.config)?;
        Ok(())
    }

    /// Load a program from assembly source code and reset.
    ///
    /// Returns the number of labels defined.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let program = assemble(source, LISTING_IMAGE_SIZE).map_err(js_err)?;
        let labels = program.symbols.len();
        self.cpu = build(program.image, self.config)?;
        Ok(labels)
    }

    /// Load a program from a disassembly listing and reset.
    #[wasm_bindgen]
    pub fn load_listing(&mut self, text: &str) -> Result<(), JsError> {
        let image = parse_listing(text).map_err(js_err)?;
        self.cpu = build(image, self.config)?;
        Ok(())
    }

    /// Advance one phase. Returns the trace line.
    #[wasm_bindgen]
    pub fn step(&mut self, reset: bool, data_in: bool) -> String {
        self.cpu.step(reset, data_in).to_string()
    }

    /// Advance one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step_instruction(&mut self) -> String {
        self.cpu.step_instruction();
        disassemble_instruction(self.cpu.opcode())
    }

    /// Advance `steps` phases with a fixed serial input.
    #[wasm_bindgen]
    pub fn run(&mut self, steps: u32, data_in: bool) -> u64 {
        for _ in 0..steps {
            self.cpu.step(false, data_in);
        }
        self.cpu.steps()
    }

    /// Hold reset for one step.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu.step(true, false);
    }

    /// Get the program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.cpu.pc().value()
    }

    /// Get the accumulator.
    #[wasm_bindgen]
    pub fn accumulator(&self) -> u8 {
        self.cpu.accumulator().value()
    }

    /// Get the current phase name.
    #[wasm_bindgen]
    pub fn phase(&self) -> String {
        self.cpu.phase().to_string()
    }

    #[wasm_bindgen]
    pub fn skip(&self) -> bool {
        self.cpu.skip()
    }

    #[wasm_bindgen]
    pub fn serial_out(&self) -> bool {
        self.cpu.serial_out()
    }

    /// Get step count.
    #[wasm_bindgen]
    pub fn steps(&self) -> u64 {
        self.cpu.steps()
    }

    /// Get all RAM cells.
    #[wasm_bindgen]
    pub fn ram_all(&self) -> Vec<u8> {
        self.cpu.ram.cells().iter().map(|n| n.value()).collect()
    }

    /// Get the full core state as JSON.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.snapshot()).map_err(js_err)
    }
}

fn build(image: Vec<u8>, config: CpuConfig) -> Result<Cpu, JsError> {
    let rom = Rom::new(image).map_err(js_err)?;
    let mut cpu = Cpu::new(rom, config).map_err(js_err)?;
    cpu.step(true, false);
    Ok(cpu)
}

/// Disassemble a single opcode.
#[wasm_bindgen]
pub fn wasm_disassemble(opcode: u8) -> String {
    disassemble_instruction(opcode)
}
