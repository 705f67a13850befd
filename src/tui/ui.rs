//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::cpu::memory::{Access, RAM_SIZE};
use crate::cpu::Phase;
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Percentage(45),
        ])
        .split(frame.area());

    // Left side: code, registers and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: RAM, trace and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10),
            Constraint::Min(6),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_ram(frame, right_chunks[0], app);
    draw_trace(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Draw disassembly around the PC.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw register and pin state.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let cpu = &app.cpu;
    let regs = &cpu.regs;

    let content = vec![
        Line::from(vec![
            Span::raw("A: "),
            Span::styled(format!("{}", regs.a), Style::default().fg(Color::White)),
            Span::raw("   W: "),
            Span::styled(format!("{:02X}", regs.working.value()), Style::default().fg(Color::White)),
            Span::raw("   X: "),
            Span::styled(format!("{}", regs.x), Style::default().fg(Color::White)),
            Span::raw("   B: "),
            Span::styled(format!("{}", regs.b), Style::default().fg(Color::White)),
            Span::raw("   C: "),
            Span::styled(format!("{}", regs.carry as u8), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::raw("PC: "),
            Span::styled(format!("{}", cpu.pc()), Style::default().fg(Color::Yellow)),
            Span::raw(format!(" (bank {}, poly {:02X})", cpu.pc().bank(), cpu.pc().poly())),
            Span::raw("   OP: "),
            Span::styled(format!("{:02X}", cpu.opcode()), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::raw("Phase: "),
            Span::styled(format!("{:<6}", cpu.phase()), phase_style(cpu.phase())),
            Span::raw(format!(" → {}", cpu.upcoming_phase())),
            Span::raw("   Skip: "),
            Span::styled(
                format!("{}", cpu.skip() as u8),
                if cpu.skip() {
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::DarkGray)
                },
            ),
        ]),
        Line::from(vec![
            Span::raw("In: "),
            Span::styled(format!("{}", app.data_in as u8), Style::default().fg(Color::Cyan)),
            Span::raw("   Out: "),
            Span::styled(format!("{}", cpu.serial_out() as u8), Style::default().fg(Color::Cyan)),
            Span::raw("   Steps: "),
            Span::styled(format!("{}", cpu.steps()), Style::default().fg(Color::Cyan)),
            Span::raw("   Illegal: "),
            Span::styled(
                format!("{}", cpu.illegal_count()),
                if cpu.illegal_count() > 0 {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default().fg(Color::Green)
                },
            ),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw RAM, one cell per row.
fn draw_ram(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.ram_scroll;
    let end = (start + visible_rows).min(RAM_SIZE);
    let pointer = app.cpu.regs.b.ram_address() as usize;
    let last = app.cpu.last_ram_access();

    let items: Vec<ListItem> = (start..end)
        .map(|idx| {
            let value = app.cpu.ram.peek(idx as u8);
            let touched = last.filter(|a| a.addr as usize == idx).map(|a| a.direction);
            let marker = match touched {
                Some(Access::Read) => " R",
                Some(Access::Write) => " W",
                None => "",
            };
            let text = format!("{:02X}: {}{}", idx, value, marker);

            let style = if idx == pointer {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if value.value() != 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" RAM ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw the most recent step records.
fn draw_trace(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let skip = app.trace.len().saturating_sub(visible_rows);

    let items: Vec<ListItem> = app
        .trace
        .iter()
        .skip(skip)
        .map(|record| {
            let style = if record.event.is_some() {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            ListItem::new(record.to_string()).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Trace ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)));

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Phase  i: Instr  r: Run  p: Pause  b: Breakpoint"),
        Line::from("d: Serial in  x: Reset  ↑↓: Scroll RAM  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// Color for each phase.
fn phase_style(phase: Phase) -> Style {
    match phase {
        Phase::Load => Style::default().fg(Color::Gray),
        Phase::Read => Style::default().fg(Color::Cyan),
        Phase::Modify => Style::default().fg(Color::Magenta),
        Phase::Write => Style::default().fg(Color::Green),
    }
}
