//! CPU execution engine.
//!
//! One call to [`Cpu::step`] is one clock edge. Each edge enters the
//! upcoming phase of the four-phase cycle and runs whatever the current
//! opcode does in that phase:
//!
//! | entering | action |
//! |---|---|
//! | Read | latch opcode from ROM (or NOP if a skip is pending), then stage operands |
//! | Modify | ALU operation on the working value |
//! | Write | commit results, raise skip, advance PC |
//! | Load | nothing; ROM is being addressed |
//!
//! Reset is an argument of `step`, evaluated before anything else on every
//! edge it is held.

use std::fmt;
use crate::bits::{Address, Nibble, Working};
use crate::cpu::decode::{self, Instruction, NOP};
use crate::cpu::memory::{MemoryError, Ram, RamAccess, Rom, RomBus};
use crate::cpu::pc::{PcControl, ProgramCounter};
use crate::cpu::phase::{CycleState, Phase};
use crate::cpu::registers::{Registers, ReturnStack};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Construction-time settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    /// Bank loaded into PC bits 9..7 by reset.
    pub reset_bank: u8,
}

/// Why a skip was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipCause {
    /// Add-immediate carried out of bit 3.
    Carry,
    /// Skip-if-equal matched.
    Equal,
}

/// Something observable that happened on a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepEvent {
    /// Reset was held for this step.
    Reset,
    /// An opcode was latched. `suppressed` means a pending skip replaced it with NOP.
    Fetch { pc: Address, opcode: u8, suppressed: bool },
    /// The instruction at `pc` raised a skip.
    SkipRaised { pc: Address, cause: SkipCause },
    /// A reserved opcode was consumed as skip-and-advance.
    IllegalOpcode { pc: Address, opcode: u8 },
}

/// What a single step produced, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Steps taken since construction, counting this one.
    pub step: u64,
    /// Phase the core is in after the step.
    pub phase: Phase,
    pub pc: Address,
    pub opcode: u8,
    pub a: Nibble,
    pub working: Working,
    pub x: Nibble,
    pub b: u8,
    pub skip: bool,
    pub serial_out: bool,
    pub event: Option<StepEvent>,
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>7} {:<6} PC={} OP={:02X} A={} W={} X={} B={:02X} SK={} OUT={}",
            self.step,
            self.phase,
            self.pc,
            self.opcode,
            self.a,
            self.working,
            self.x,
            self.b,
            self.skip as u8,
            self.serial_out as u8,
        )?;
        match self.event {
            Some(StepEvent::Reset) => write!(f, "  reset"),
            Some(StepEvent::Fetch { pc, opcode, suppressed: true }) => {
                write!(f, "  fetch {} -> {:02X} (skipped)", pc, opcode)
            }
            Some(StepEvent::Fetch { pc, opcode, .. }) => write!(f, "  fetch {} -> {:02X}", pc, opcode),
            Some(StepEvent::SkipRaised { cause, .. }) => write!(f, "  skip ({:?})", cause),
            Some(StepEvent::IllegalOpcode { pc, opcode }) => {
                write!(f, "  illegal opcode {:02X} at {}", opcode, pc)
            }
            None => Ok(()),
        }
    }
}

/// Complete architectural state, for comparison and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cycle: CycleState,
    pub pc: Address,
    pub opcode: u8,
    pub regs: Registers,
    pub skip: bool,
    pub stack: ReturnStack,
    pub data_in: bool,
    pub ram: Ram,
}

/// The core.
#[derive(Clone)]
pub struct Cpu<R: RomBus = Rom> {
    /// Register file.
    pub regs: Registers,
    /// Data RAM.
    pub ram: Ram,
    pc: ProgramCounter,
    cycle: CycleState,
    opcode: u8,
    skip: bool,
    stack: ReturnStack,
    data_in: bool,
    rom: R,
    config: CpuConfig,
    steps: u64,
    illegal_count: u64,
}

impl Cpu<Rom> {
    /// Build a core from a raw ROM image with the default configuration.
    pub fn from_image(bytes: Vec<u8>) -> Result<Self, ConfigError> {
        Self::new(Rom::new(bytes)?, CpuConfig::default())
    }
}

impl<R: RomBus> Cpu<R> {
    /// Create a core in its reset state.
    pub fn new(rom: R, config: CpuConfig) -> Result<Self, ConfigError> {
        Self::with_ram(rom, Ram::new(), config)
    }

    /// Create a core with preloaded RAM.
    pub fn with_ram(rom: R, ram: Ram, config: CpuConfig) -> Result<Self, ConfigError> {
        validate(&rom, &config)?;
        Ok(Self {
            regs: Registers::new(),
            ram,
            pc: ProgramCounter::new(config.reset_bank),
            cycle: CycleState::new(),
            opcode: NOP,
            skip: false,
            stack: ReturnStack::new(),
            data_in: false,
            rom,
            config,
            steps: 0,
            illegal_count: 0,
        })
    }

    /// Advance one clock edge.
    ///
    /// While `reset` is true the core is held in its reset state. `data_in`
    /// is the serial input pin, latched on every non-reset step.
    pub fn step(&mut self, reset: bool, data_in: bool) -> StepRecord {
        self.steps += 1;

        if reset {
            self.apply_reset();
            return self.record(Some(StepEvent::Reset));
        }

        self.data_in = data_in;
        let entering = self.cycle.upcoming();

        let fetched = if entering == Phase::Read {
            Some(self.fetch())
        } else {
            None
        };

        let (control, executed) = self.execute(entering);
        self.pc.clock(control);
        self.cycle.advance();

        self.record(executed.or(fetched))
    }

    /// Step with reset released and the serial input held.
    pub fn clock(&mut self) -> StepRecord {
        self.step(false, self.data_in)
    }

    /// Step until the core is back in the Load phase.
    ///
    /// From Load this runs exactly one instruction (four steps).
    pub fn step_instruction(&mut self) -> Vec<StepRecord> {
        let mut records = Vec::with_capacity(4);
        loop {
            records.push(self.clock());
            if self.cycle.current() == Phase::Load {
                return records;
            }
        }
    }

    fn apply_reset(&mut self) {
        self.regs.reset();
        self.pc.reset(self.config.reset_bank);
        self.cycle.reset();
        self.opcode = NOP;
        self.skip = false;
        self.stack.clear();
        self.data_in = false;
    }

    /// Latch the next opcode, consuming any pending skip.
    fn fetch(&mut self) -> StepEvent {
        let pc = self.pc.get();
        let suppressed = self.skip;
        self.opcode = if suppressed { NOP } else { self.rom.read(pc) };
        self.skip = false;
        StepEvent::Fetch { pc, opcode: self.opcode, suppressed }
    }

    /// Run the current opcode's action for the phase being entered.
    fn execute(&mut self, entering: Phase) -> (PcControl, Option<StepEvent>) {
        let pc = self.pc.get();

        match (decode::decode(self.opcode), entering) {
            (_, Phase::Load) => (PcControl::HOLD, None),

            // ==================== Add immediate ====================

            (Instruction::AddImmediate(_), Phase::Read) => {
                self.regs.working = self.regs.a.widen();
                (PcControl::HOLD, None)
            }

            (Instruction::AddImmediate(imm), Phase::Modify) => {
                self.regs.working = self.regs.working.wrapping_add(imm);
                (PcControl::HOLD, None)
            }

            (Instruction::AddImmediate(_), Phase::Write) => {
                self.regs.a = self.regs.working.low();
                let event = if self.regs.working.carry_out() {
                    self.skip = true;
                    Some(StepEvent::SkipRaised { pc, cause: SkipCause::Carry })
                } else {
                    None
                };
                (PcControl::INCREMENT, event)
            }

            // ==================== Skip if A = imm ====================

            (Instruction::SkipIfEqual(_), Phase::Read) => {
                self.regs.working = self.regs.a.widen();
                (PcControl::HOLD, None)
            }

            (Instruction::SkipIfEqual(imm), Phase::Write) => {
                let event = if self.regs.working == imm.widen() {
                    self.skip = true;
                    Some(StepEvent::SkipRaised { pc, cause: SkipCause::Equal })
                } else {
                    None
                };
                (PcControl::INCREMENT, event)
            }

            // ==================== Immediate loads ====================

            (Instruction::LoadBl(imm), Phase::Write) => {
                self.regs.set_bl(imm);
                (PcControl::INCREMENT, None)
            }

            (Instruction::LoadA(imm), Phase::Write) => {
                self.regs.a = imm;
                (PcControl::INCREMENT, None)
            }

            // ==================== Reserved ====================

            (Instruction::Illegal(opcode), Phase::Write) => {
                self.skip = true;
                self.illegal_count += 1;
                (PcControl::INCREMENT, Some(StepEvent::IllegalOpcode { pc, opcode }))
            }

            _ => (PcControl::HOLD, None),
        }
    }

    fn record(&self, event: Option<StepEvent>) -> StepRecord {
        StepRecord {
            step: self.steps,
            phase: self.cycle.current(),
            pc: self.pc.get(),
            opcode: self.opcode,
            a: self.regs.a,
            working: self.regs.working,
            x: self.regs.x,
            b: self.regs.b.value(),
            skip: self.skip,
            serial_out: self.serial_out(),
            event,
        }
    }

    /// Capture the full architectural state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cycle: self.cycle,
            pc: self.pc.get(),
            opcode: self.opcode,
            regs: self.regs,
            skip: self.skip,
            stack: self.stack,
            data_in: self.data_in,
            ram: self.ram.clone(),
        }
    }

    /// Current program counter.
    #[inline]
    pub fn pc(&self) -> Address {
        self.pc.get()
    }

    /// Phase the core is in.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.cycle.current()
    }

    /// Phase the next step will enter.
    #[inline]
    pub fn upcoming_phase(&self) -> Phase {
        self.cycle.upcoming()
    }

    /// Contents of the opcode register.
    #[inline]
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// The opcode register, decoded.
    pub fn instruction(&self) -> Instruction {
        decode::decode(self.opcode)
    }

    /// Whether the next fetched instruction will be replaced by NOP.
    #[inline]
    pub fn skip(&self) -> bool {
        self.skip
    }

    #[inline]
    pub fn accumulator(&self) -> Nibble {
        self.regs.a
    }

    /// The 5-bit ALU working value.
    #[inline]
    pub fn working(&self) -> Working {
        self.regs.working
    }

    /// Serial output pin: accumulator bit 0.
    #[inline]
    pub fn serial_out(&self) -> bool {
        self.regs.a.bit(0)
    }

    /// Last latched serial input.
    #[inline]
    pub fn data_in(&self) -> bool {
        self.data_in
    }

    pub fn stack(&self) -> &ReturnStack {
        &self.stack
    }

    /// Most recent RAM access.
    pub fn last_ram_access(&self) -> Option<RamAccess> {
        self.ram.last_access()
    }

    /// Steps taken since construction.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Reserved opcodes executed since construction.
    pub fn illegal_count(&self) -> u64 {
        self.illegal_count
    }

    pub fn rom(&self) -> &R {
        &self.rom
    }

    pub fn config(&self) -> &CpuConfig {
        &self.config
    }
}

fn validate<R: RomBus>(rom: &R, config: &CpuConfig) -> Result<(), ConfigError> {
    if config.reset_bank >= Address::BANKS {
        return Err(ConfigError::BankOutOfRange(config.reset_bank));
    }
    let end = (config.reset_bank as usize + 1) * Address::BANK_SIZE;
    if end > rom.len() {
        return Err(ConfigError::BankOutsideRom { bank: config.reset_bank, rom_len: rom.len() });
    }
    Ok(())
}

impl<R: RomBus> fmt::Debug for Cpu<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("phase", &self.cycle.current())
            .field("pc", &self.pc.get())
            .field("opcode", &format_args!("{:02X}", self.opcode))
            .field("skip", &self.skip)
            .field("regs", &self.regs)
            .field("steps", &self.steps)
            .finish()
    }
}

/// Errors rejected when a core is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("reset bank {0} out of range (0-7)")]
    BankOutOfRange(u8),

    #[error("reset bank {bank} lies outside a {rom_len}-byte ROM")]
    BankOutsideRom { bank: u8, rom_len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Pointer;
    use crate::cpu::memory::RomFn;

    /// 512-byte ROM with the given bytes placed.
    fn make_rom(bytes: &[(u16, u8)]) -> Rom {
        let mut image = vec![0u8; 512];
        for &(addr, byte) in bytes {
            image[addr as usize] = byte;
        }
        Rom::new(image).unwrap()
    }

    fn make_cpu(bytes: &[(u16, u8)]) -> Cpu {
        Cpu::new(make_rom(bytes), CpuConfig::default()).unwrap()
    }

    fn run(cpu: &mut Cpu, steps: usize) -> Vec<StepRecord> {
        (0..steps).map(|_| cpu.step(false, false)).collect()
    }

    #[test]
    fn test_initial_state_is_reset_state() {
        let cpu = make_cpu(&[]);
        assert_eq!(cpu.phase(), Phase::Load);
        assert_eq!(cpu.upcoming_phase(), Phase::Read);
        assert_eq!(cpu.pc().value(), 0);
        assert_eq!(cpu.opcode(), NOP);
        assert!(!cpu.skip());
    }

    #[test]
    fn test_reset_is_level_sensitive() {
        let mut cpu = make_cpu(&[(0x000, 0x37), (0x040, 0x4F)]);
        run(&mut cpu, 7);
        assert_ne!(cpu.pc().value(), 0);
        assert!(cpu.skip());

        for _ in 0..5 {
            let record = cpu.step(true, true);
            assert_eq!(record.event, Some(StepEvent::Reset));
            assert_eq!(cpu.snapshot().regs, Registers::new());
            assert_eq!(cpu.pc().value(), 0);
            assert_eq!(cpu.phase(), Phase::Load);
            assert_eq!(cpu.upcoming_phase(), Phase::Read);
            assert_eq!(cpu.opcode(), NOP);
            assert!(!cpu.skip());
            assert!(!cpu.data_in());
        }

        // Released: the first instruction is the one at the reset address.
        run(&mut cpu, 4);
        assert_eq!(cpu.accumulator().value(), 0x7);
    }

    #[test]
    fn test_one_instruction_takes_four_steps() {
        let mut cpu = make_cpu(&[(0x000, 0x3C)]);
        let phases: Vec<Phase> = run(&mut cpu, 4).iter().map(|r| r.phase).collect();
        assert_eq!(phases, vec![Phase::Read, Phase::Modify, Phase::Write, Phase::Load]);
        assert_eq!(cpu.accumulator().value(), 0xC);
        assert_eq!(cpu.pc().value(), 0x40);
    }

    #[test]
    fn test_add_immediate_overflow_raises_skip() {
        let mut cpu = make_cpu(&[(0x000, 0x01)]);
        cpu.regs.a = Nibble::new(0xF);

        let records = run(&mut cpu, 4);
        assert_eq!(cpu.accumulator().value(), 0x0);
        assert!(cpu.skip());
        assert_eq!(
            records[2].event,
            Some(StepEvent::SkipRaised { pc: Address::zero(), cause: SkipCause::Carry })
        );
    }

    #[test]
    fn test_add_immediate_without_overflow() {
        let mut cpu = make_cpu(&[(0x000, 0x02)]);
        cpu.regs.a = Nibble::new(0x3);
        run(&mut cpu, 4);
        assert_eq!(cpu.accumulator().value(), 0x5);
        assert!(!cpu.skip());
    }

    #[test]
    fn test_add_stages_working_value_per_phase() {
        let mut cpu = make_cpu(&[(0x000, 0x09)]);
        cpu.regs.a = Nibble::new(0x9);

        cpu.clock(); // Read
        assert_eq!(cpu.working().value(), 0x09);
        assert_eq!(cpu.accumulator().value(), 0x9);

        cpu.clock(); // Modify
        assert_eq!(cpu.working().value(), 0x12);
        assert_eq!(cpu.accumulator().value(), 0x9);

        cpu.clock(); // Write
        assert_eq!(cpu.accumulator().value(), 0x2);
        assert!(cpu.skip());
    }

    #[test]
    fn test_skip_if_equal_match() {
        let mut cpu = make_cpu(&[(0x000, 0x1A)]);
        cpu.regs.a = Nibble::new(0xA);
        run(&mut cpu, 4);
        assert!(cpu.skip());
        assert_eq!(cpu.pc().value(), 0x40);
    }

    #[test]
    fn test_skip_if_equal_no_match() {
        let mut cpu = make_cpu(&[(0x000, 0x13)]);
        cpu.regs.a = Nibble::new(0xA);
        run(&mut cpu, 4);
        assert!(!cpu.skip());
        assert_eq!(cpu.pc().value(), 0x40);
        assert_eq!(cpu.accumulator().value(), 0xA);
    }

    #[test]
    fn test_load_bl_immediate() {
        let mut cpu = make_cpu(&[(0x000, 0x25)]);
        cpu.regs.b = Pointer::from_parts(1, Nibble::new(0xE));

        run(&mut cpu, 2);
        assert_eq!(cpu.regs.b.bl().value(), 0xE);

        cpu.clock(); // Write
        assert_eq!(cpu.regs.b.bl().value(), 0x5);
        assert_eq!(cpu.regs.b.bh(), 1);
    }

    #[test]
    fn test_load_a_only_on_write() {
        let mut cpu = make_cpu(&[(0x000, 0x36)]);
        run(&mut cpu, 2);
        assert_eq!(cpu.accumulator().value(), 0);
        cpu.clock();
        assert_eq!(cpu.accumulator().value(), 6);
        assert!(!cpu.serial_out());
    }

    #[test]
    fn test_illegal_opcodes_skip_and_advance() {
        for opcode in 0x40..=0xFFu8 {
            let mut cpu = make_cpu(&[(0x000, opcode)]);
            cpu.regs.a = Nibble::new(0x9);
            cpu.regs.x = Nibble::new(0x4);
            cpu.regs.b = Pointer::new(0x2C);
            let before = cpu.regs;

            let records = run(&mut cpu, 4);
            assert!(cpu.skip(), "opcode {:02X}", opcode);
            assert_eq!(cpu.pc().value(), 0x40);
            assert_eq!(cpu.regs, before, "opcode {:02X}", opcode);
            assert_eq!(
                records[2].event,
                Some(StepEvent::IllegalOpcode { pc: Address::zero(), opcode })
            );
            assert_eq!(cpu.illegal_count(), 1);
        }
    }

    #[test]
    fn test_skip_consumption() {
        // LAI F; ADI 1 (carries); LAI 5 (skipped); LAI 7
        let mut cpu = make_cpu(&[(0x000, 0x3F), (0x040, 0x01), (0x060, 0x35), (0x070, 0x37)]);

        run(&mut cpu, 8);
        assert_eq!(cpu.accumulator().value(), 0x0);
        assert!(cpu.skip());
        assert_eq!(cpu.pc().value(), 0x60);

        let records = run(&mut cpu, 4);
        assert_eq!(
            records[0].event,
            Some(StepEvent::Fetch { pc: Address::new(0x60), opcode: NOP, suppressed: true })
        );
        assert!(!cpu.skip());
        assert_eq!(cpu.accumulator().value(), 0x0);
        assert_eq!(cpu.pc().value(), 0x70);

        run(&mut cpu, 4);
        assert_eq!(cpu.accumulator().value(), 0x7);
        assert_eq!(cpu.pc().value(), 0x78);
    }

    #[test]
    fn test_step_instruction() {
        let mut cpu = make_cpu(&[(0x000, 0x34), (0x040, 0x22)]);
        assert_eq!(cpu.step_instruction().len(), 4);
        assert_eq!(cpu.accumulator().value(), 4);

        cpu.clock();
        assert_eq!(cpu.step_instruction().len(), 3);
        assert_eq!(cpu.regs.b.bl().value(), 2);
    }

    #[test]
    fn test_serial_pins() {
        let mut cpu = make_cpu(&[(0x000, 0x33)]);
        cpu.step(false, true);
        assert!(cpu.data_in());
        run(&mut cpu, 3);
        assert!(!cpu.data_in());
        assert!(cpu.serial_out());
    }

    #[test]
    fn test_reset_bank_config() {
        let config = CpuConfig { reset_bank: 3 };
        let mut image = vec![0u8; 512];
        image[0x180] = 0x3B;
        let mut cpu = Cpu::new(Rom::new(image).unwrap(), config).unwrap();
        assert_eq!(cpu.pc(), Address::from_parts(3, 0));
        run(&mut cpu, 4);
        assert_eq!(cpu.accumulator().value(), 0xB);
        assert_eq!(cpu.pc(), Address::from_parts(3, 0x40));

        let err = Cpu::new(make_rom(&[]), CpuConfig { reset_bank: 4 }).unwrap_err();
        assert_eq!(err, ConfigError::BankOutsideRom { bank: 4, rom_len: 512 });

        let err = Cpu::new(make_rom(&[]), CpuConfig { reset_bank: 8 }).unwrap_err();
        assert_eq!(err, ConfigError::BankOutOfRange(8));
    }

    #[test]
    fn test_bad_image_rejected() {
        let err = Cpu::from_image(vec![0; 600]).unwrap_err();
        assert_eq!(err, ConfigError::Memory(MemoryError::RomSize(600)));
    }

    #[test]
    fn test_rom_function() {
        let rom = RomFn::new(512, |addr: Address| if addr.poly() == 0 { 0x3D } else { 0x00 }).unwrap();
        let mut cpu = Cpu::new(rom, CpuConfig::default()).unwrap();
        cpu.step_instruction();
        assert_eq!(cpu.accumulator().value(), 0xD);
    }

    #[test]
    fn test_config_from_json() {
        let config: CpuConfig = serde_json::from_str(r#"{"reset_bank": 2}"#).unwrap();
        assert_eq!(config.reset_bank, 2);
        let config: CpuConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CpuConfig::default());
    }
}
