//! Debugger application state and logic.

use crate::asm::disasm::disassemble_instruction;
use crate::bits::Address;
use crate::cpu::{Cpu, Phase, RomBus, StepEvent, StepRecord};
use std::collections::{HashSet, VecDeque};

/// Number of step records kept for the trace panel.
const TRACE_LEN: usize = 64;

/// Instructions executed per tick while running.
const RUN_BATCH: usize = 16;

/// Debugger application state.
pub struct DebuggerApp {
    /// The core being debugged.
    pub cpu: Cpu,
    /// Breakpoints (by PC, checked at instruction boundaries).
    pub breakpoints: HashSet<Address>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// RAM view scroll offset.
    pub ram_scroll: usize,
    /// Level driven onto the serial input.
    pub data_in: bool,
    /// Most recent step records, newest last.
    pub trace: VecDeque<StepRecord>,
}

impl DebuggerApp {
    /// Create a debugger around a core, holding reset for one step.
    pub fn new(cpu: Cpu) -> Self {
        let mut app = Self {
            cpu,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: String::new(),
            ram_scroll: 0,
            data_in: false,
            trace: VecDeque::with_capacity(TRACE_LEN),
        };
        app.reset();
        app.status = "Ready. 's' phase, 'i' instruction, 'r' run, 'q' quit.".into();
        app
    }

    fn push_trace(&mut self, record: StepRecord) {
        if self.trace.len() == TRACE_LEN {
            self.trace.pop_front();
        }
        self.trace.push_back(record);
    }

    /// Advance one phase.
    pub fn step_phase(&mut self) {
        let record = self.cpu.step(false, self.data_in);
        self.status = describe(&record);
        self.push_trace(record);
    }

    /// Advance to the next instruction boundary.
    pub fn step_instruction(&mut self) {
        let pc = self.cpu.pc();
        let mut note = "";
        loop {
            let record = self.cpu.step(false, self.data_in);
            match record.event {
                Some(StepEvent::IllegalOpcode { .. }) => note = "  (illegal, skip raised)",
                Some(StepEvent::SkipRaised { .. }) => note = "  (skip raised)",
                Some(StepEvent::Fetch { suppressed: true, .. }) => note = "  (skipped)",
                _ => {}
            }
            let done = record.phase == Phase::Load;
            self.push_trace(record);
            if done {
                break;
            }
        }
        self.status = format!("{}: {}{}", pc, disassemble_instruction(self.cpu.opcode()), note);
    }

    /// Run until a breakpoint or pause.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
        // Leave the current breakpoint before checking for the next one.
        self.step_instruction();
    }

    /// Run one batch of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        for _ in 0..RUN_BATCH {
            let pc = self.cpu.pc();
            if self.cpu.phase() == Phase::Load && self.breakpoints.contains(&pc) {
                self.running = false;
                self.status = format!("Breakpoint at PC={}", pc);
                return;
            }
            self.step_instruction();
        }
    }

    /// Toggle breakpoint at the current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.pc();
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={}", pc);
        }
    }

    /// Hold reset for one step.
    pub fn reset(&mut self) {
        let record = self.cpu.step(true, false);
        self.push_trace(record);
        self.running = false;
        self.status = format!("Reset. PC={}", self.cpu.pc());
    }

    /// Flip the serial input level.
    pub fn toggle_data_in(&mut self) {
        self.data_in = !self.data_in;
        self.status = format!("Serial input = {}", self.data_in as u8);
    }

    /// Disassembly around the current PC, in execution order.
    ///
    /// Returns `(address, text, is_current)` for `lines` rows.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(Address, String, bool)> {
        let pc = self.cpu.pc();
        let mut start = pc;
        for _ in 0..lines / 2 {
            start = start.prev();
        }

        let mut addr = start;
        (0..lines)
            .map(|_| {
                let opcode = self.cpu.rom().read(addr);
                let text = format!("{:02X}  {}", opcode, disassemble_instruction(opcode));
                let row = (addr, text, addr == pc);
                addr = addr.next();
                row
            })
            .collect()
    }
}

/// One-line summary of a step for the status bar.
fn describe(record: &StepRecord) -> String {
    let what = match record.event {
        Some(StepEvent::Reset) => "reset".to_string(),
        Some(StepEvent::Fetch { pc, opcode, suppressed: true }) => {
            format!("fetch {} -> {:02X} (skipped)", pc, opcode)
        }
        Some(StepEvent::Fetch { pc, opcode, .. }) => {
            format!("fetch {} -> {}", pc, disassemble_instruction(opcode))
        }
        Some(StepEvent::SkipRaised { cause, .. }) => format!("skip raised ({:?})", cause),
        Some(StepEvent::IllegalOpcode { opcode, .. }) => format!("illegal opcode {:02X}", opcode),
        None => String::new(),
    };
    format!("{} PC={} {}", record.phase, record.pc, what)
}

/// Run the debugger on a core.
pub fn run_debugger(cpu: Cpu) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(cpu);

    // Main loop
    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step_phase();
                        }
                        KeyCode::Char('i') => {
                            app.running = false;
                            app.step_instruction();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('d') => app.toggle_data_in(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => {
                            app.ram_scroll = app.ram_scroll.saturating_sub(1);
                        }
                        KeyCode::Down => {
                            if app.ram_scroll + 1 < crate::cpu::memory::RAM_SIZE {
                                app.ram_scroll += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with(program: &[(usize, u8)]) -> DebuggerApp {
        let mut image = vec![0u8; 512];
        for &(addr, byte) in program {
            image[addr] = byte;
        }
        DebuggerApp::new(Cpu::from_image(image).unwrap())
    }

    #[test]
    fn test_starts_after_reset() {
        let app = app_with(&[]);
        assert_eq!(app.cpu.pc(), Address::zero());
        assert_eq!(app.cpu.phase(), Phase::Load);
        assert!(matches!(app.trace.back().unwrap().event, Some(StepEvent::Reset)));
    }

    #[test]
    fn test_phase_and_instruction_steps() {
        let mut app = app_with(&[(0x00, 0x36)]);
        app.step_phase();
        assert_eq!(app.cpu.phase(), Phase::Read);
        app.step_instruction();
        assert_eq!(app.cpu.phase(), Phase::Load);
        assert_eq!(app.cpu.accumulator().value(), 6);
        assert_eq!(app.cpu.pc(), Address::new(0x40));
    }

    #[test]
    fn test_run_stops_at_breakpoint() {
        let mut app = app_with(&[]);
        app.breakpoints.insert(Address::new(0x70));
        app.run();
        while app.running {
            app.tick();
        }
        assert_eq!(app.cpu.pc(), Address::new(0x70));
        assert!(app.status.contains("Breakpoint"));
    }

    #[test]
    fn test_disassembly_window_follows_poly_order() {
        let app = app_with(&[(0x00, 0x3F), (0x40, 0x01)]);
        let rows = app.get_disassembly(5);
        let addrs: Vec<u16> = rows.iter().map(|(a, _, _)| a.value()).collect();
        assert_eq!(addrs[2], 0x000);
        assert_eq!(addrs[3], 0x040);
        assert_eq!(addrs[4], 0x060);
        assert!(rows[2].2);
        assert!(rows[2].1.contains("LAI"));
    }

    #[test]
    fn test_trace_is_bounded() {
        let mut app = app_with(&[]);
        for _ in 0..200 {
            app.step_phase();
        }
        assert_eq!(app.trace.len(), TRACE_LEN);
    }
}
