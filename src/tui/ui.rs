//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use super::app::DebuggerApp;
use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::registers::SP;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Percentage(50),
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

    // Right side: memory, program output and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_output(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Draw disassembly view around the PC.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:02X}: {}", prefix, addr, instr);

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

/// Draw register file, flags and machine state.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.cpu.regs;
    let gpr = regs.gpr();

    let content = vec![
        register_line(gpr, 0..4),
        register_line(gpr, 4..8),
        Line::from(vec![
            Span::raw("PC: "),
            Span::styled(format!("{:02X}", regs.pc), Style::default().fg(Color::Yellow)),
            Span::raw("   FL: "),
            Span::styled(format!("{:08b}", regs.fl), Style::default().fg(Color::White)),
            Span::raw("  "),
            flag_span("L", regs.less()),
            flag_span("G", regs.greater()),
            flag_span("E", regs.equal()),
        ]),
        Line::from(vec![
            Span::raw("Cycles: "),
            Span::styled(format!("{}", app.cpu.cycles), Style::default().fg(Color::Cyan)),
            Span::raw("   Last: "),
            Span::styled(app.last_executed(), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            Span::styled(format!("{:?}", app.cpu.state),
                if app.cpu.is_running() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::Red)
                }),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw a hex view of memory, 16 bytes per row.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let first_row = app.mem_scroll;
    let last_row = (first_row + visible_rows).min(MEMORY_SIZE / 16);
    let pc = app.cpu.regs.pc;
    let sp = app.cpu.regs.sp() as usize;
    let bytes = app.cpu.mem.as_slice();

    let items: Vec<ListItem> = (first_row..last_row)
        .map(|row| {
            let base = row * 16;
            let mut spans = vec![Span::styled(format!("{:02X}: ", base), Style::default().fg(Color::DarkGray))];

            for addr in base..base + 16 {
                let value = bytes[addr];
                let style = if addr == pc {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if addr == sp {
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
                } else if value != 0 {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::styled(format!("{:02X} ", value), style));
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw the most recent program output.
fn draw_output(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible = (area.height as usize).saturating_sub(2);
    let skip = app.output.len().saturating_sub(visible);
    let lines: Vec<Line> = app.output
        .iter()
        .skip(skip)
        .map(|l| Line::from(l.as_str()))
        .collect();

    let output = Paragraph::new(lines)
        .block(Block::default()
            .title(" Output ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)));

    frame.render_widget(output, area);
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
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint"),
        Line::from("x: Reset  ↑↓: Scroll memory  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// One row of general purpose registers, R7 shown as SP.
fn register_line(gpr: &[u8], range: std::ops::Range<usize>) -> Line<'static> {
    let mut spans = Vec::new();
    for i in range {
        let name = if i == SP as usize { "SP".to_string() } else { format!("R{}", i) };
        spans.push(Span::raw(format!("{}: ", name)));
        spans.push(Span::styled(format!("{:02X}  ", gpr[i]), Style::default().fg(Color::White)));
    }
    Line::from(spans)
}

/// A flag letter, lit when set.
fn flag_span(name: &'static str, set: bool) -> Span<'static> {
    if set {
        Span::styled(name, Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        Span::styled(name, Style::default().fg(Color::DarkGray))
    }
}
