//! Debugger application state and logic.

use std::collections::HashSet;

use crossterm::event::KeyCode;

use crate::Cpu;
use crate::asm::disasm::{disassemble_instruction, instruction_starts};
use crate::cpu::memory::MEMORY_SIZE;

/// Number of output lines kept for the output panel.
const OUTPUT_HISTORY: usize = 200;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Original program for reference.
    pub program: Vec<u8>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<usize>,
    /// Lines printed by the program so far.
    pub output: Vec<String>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset (in 16-byte rows).
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<u8>) -> Self {
        let mut app = Self {
            cpu: Cpu::new(),
            program,
            breakpoints: HashSet::new(),
            output: Vec::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
        };
        app.load();
        app
    }

    fn load(&mut self) {
        self.cpu = Cpu::new();
        if let Err(e) = self.cpu.load_program(&self.program) {
            self.status = format!("Load error: {}", e);
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU stopped: {:?}", self.cpu.state);
            self.running = false;
            return;
        }

        let pc = self.cpu.regs.pc;
        let listing = self.disassemble_at(pc);
        let mut printed = Vec::new();

        match self.cpu.step(&mut printed) {
            Ok(_) => {
                self.status = format!("PC={:02X}: {}", pc, listing);
            }
            Err(e) => {
                self.status = format!("Fault: {}", e);
                self.running = false;
            }
        }

        self.capture_output(&printed);
    }

    fn capture_output(&mut self, printed: &[u8]) {
        let text = String::from_utf8_lossy(printed);
        self.output.extend(text.lines().map(str::to_string));
        if self.output.len() > OUTPUT_HISTORY {
            let excess = self.output.len() - OUTPUT_HISTORY;
            self.output.drain(..excess);
        }
    }

    /// Run until halt, breakpoint, or fault.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() {
            self.running = false;
            self.status = format!("{:?} after {} instructions", self.cpu.state, self.cpu.cycles);
            return;
        }

        self.step();

        // Check for breakpoint
        let pc = self.cpu.regs.pc;
        if self.running && self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={:02X}", pc);
        }
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:02X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:02X}", pc);
        }
    }

    /// Reset CPU to initial state.
    pub fn reset(&mut self) {
        self.load();
        self.output.clear();
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    pub fn scroll_up(&mut self) {
        self.mem_scroll = self.mem_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        if self.mem_scroll + 1 < MEMORY_SIZE / 16 {
            self.mem_scroll += 1;
        }
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('s') => {
                self.running = false;
                self.step();
            }
            KeyCode::Char('r') => self.run(),
            KeyCode::Char('p') => {
                self.running = false;
                self.status = "Paused.".into();
            }
            KeyCode::Char('b') => self.toggle_breakpoint(),
            KeyCode::Char('x') => self.reset(),
            KeyCode::Up => self.scroll_up(),
            KeyCode::Down => self.scroll_down(),
            _ => {}
        }
    }

    /// Mnemonic of the most recently executed instruction.
    pub fn last_executed(&self) -> &'static str {
        self.cpu.last_opcode().map_or("-", |op| op.mnemonic())
    }

    fn disassemble_at(&self, addr: usize) -> String {
        let bytes = self.cpu.mem.as_slice();
        let end = (addr + 3).min(bytes.len());
        match bytes.get(addr..end) {
            Some(chunk) => disassemble_instruction(chunk),
            None => "??".into(),
        }
    }

    /// Get up to `lines` disassembled instructions from the program region,
    /// starting a few instructions before the current PC.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(usize, String, bool)> {
        let pc = self.cpu.regs.pc;
        let region = self.program.len().max(pc + 1).min(MEMORY_SIZE);
        let image = &self.cpu.mem.as_slice()[..region];

        let mut starts = instruction_starts(image);
        // The PC can land mid-sweep after a jump; show it as its own row.
        if pc < region && !starts.iter().any(|&(addr, _)| addr == pc) {
            starts = instruction_starts(&image[..pc]);
            starts.extend(
                instruction_starts(&image[pc..])
                    .into_iter()
                    .map(|(addr, len)| (addr + pc, len)),
            );
        }

        let current = starts.iter().position(|&(addr, _)| addr == pc).unwrap_or(0);
        let first = current.saturating_sub(lines / 3);

        starts
            .into_iter()
            .skip(first)
            .take(lines)
            .map(|(addr, len)| {
                let listing = disassemble_instruction(&image[addr..addr + len]);
                (addr, listing, addr == pc)
            })
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<u8>) -> std::io::Result<()> {
    use ratatui::prelude::*;
    use std::io::stdout;

    // Restores the terminal on every exit path, errors included.
    let _guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(program);
    event_loop(&mut terminal, &mut app)
}

fn event_loop<B: ratatui::backend::Backend>(
    terminal: &mut ratatui::Terminal<B>,
    app: &mut DebuggerApp,
) -> std::io::Result<()> {
    use crossterm::event::{self, Event, KeyEventKind};
    use std::time::Duration;

    while !app.should_quit {
        terminal.draw(|frame| {
            super::ui::draw(frame, app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        if app.running {
            app.tick();
        }
    }

    Ok(())
}

/// Raw mode and the alternate screen, undone on drop.
#[derive(Default)]
struct TerminalGuard {
    raw_mode: bool,
    alternate_screen: bool,
}

impl TerminalGuard {
    fn enter() -> std::io::Result<Self> {
        use crossterm::{terminal::{enable_raw_mode, EnterAlternateScreen}, ExecutableCommand};

        let mut guard = Self::default();
        enable_raw_mode()?;
        guard.raw_mode = true;
        std::io::stdout().execute(EnterAlternateScreen)?;
        guard.alternate_screen = true;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        use crossterm::{terminal::{disable_raw_mode, LeaveAlternateScreen}, ExecutableCommand};

        if self.alternate_screen {
            let _ = std::io::stdout().execute(LeaveAlternateScreen);
        }
        if self.raw_mode {
            let _ = disable_raw_mode();
        }
    }
}
