//! CPU execution engine for the LS-8.
//!
//! Implements the fetch-decode-execute cycle on top of the dispatch table.

use std::io::Write;

use log::{debug, trace, warn};
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::cpu::{Memory, Registers};
use crate::cpu::decode::Opcode;
use crate::cpu::dispatch;
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::{RegisterError, REGISTER_COUNT};

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HLT instruction).
    Halted,
    /// An instruction faulted; the machine keeps its state at the fault.
    Faulted,
}

/// The LS-8 CPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count (HLT included).
    pub cycles: u64,
    /// Last executed instruction (for debugging).
    last_opcode: Option<Opcode>,
}

impl Cpu {
    /// Create a new CPU in its power-on state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            last_opcode: None,
        }
    }

    /// Reset the CPU to its power-on state, clearing memory.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_opcode = None;
    }

    /// Copy a program image into memory at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(0, program)?;
        debug!("loaded {} byte program", program.len());
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the opcode that was executed. Any error moves the CPU to
    /// `CpuState::Faulted`.
    pub fn step(&mut self, out: &mut dyn Write) -> Result<Opcode, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        if log::log_enabled!(log::Level::Trace) {
            trace!("{}", self.trace_line());
        }

        match self.execute_next(out) {
            Ok(opcode) => {
                self.cycles += 1;
                self.last_opcode = Some(opcode);
                if self.state == CpuState::Halted {
                    debug!("halted at PC={:#04x} after {} instructions", self.regs.pc, self.cycles);
                }
                Ok(opcode)
            }
            Err(e) => {
                self.state = CpuState::Faulted;
                warn!("fault at PC={:#04x}: {}", self.regs.pc, e);
                Err(e)
            }
        }
    }

    /// Run until halt or fault.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self, out: &mut dyn Write) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, out: &mut dyn Write, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles + max_cycles;

        while self.state == CpuState::Running && self.cycles < limit {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Fetch, dispatch and execute the instruction at the PC.
    fn execute_next(&mut self, out: &mut dyn Write) -> Result<Opcode, CpuError> {
        // Fetch
        let pc = self.regs.pc;
        let byte = self.mem.read(pc)?;

        // Dispatch
        let entry = dispatch::table()
            .lookup(byte)
            .ok_or(CpuError::InvalidInstruction { opcode: byte, pc })?;

        // Execute
        (entry.handler)(self, out)?;

        // Jumps, CALL and RET have already placed the PC; HLT leaves it on itself.
        if self.state == CpuState::Running && !entry.opcode.sets_pc() {
            self.regs.advance_pc(entry.opcode.instruction_len());
        }

        Ok(entry.opcode)
    }

    /// Read the operand byte `offset` bytes past the PC.
    #[inline]
    pub fn operand(&self, offset: usize) -> Result<u8, CpuError> {
        Ok(self.mem.read(self.regs.pc + offset)?)
    }

    /// Push a byte: decrement SP, then write at SP.
    pub fn push_byte(&mut self, value: u8) -> Result<(), CpuError> {
        let sp = self.regs.sp().checked_sub(1).ok_or(CpuError::StackOverflow)?;
        self.mem.write(sp as usize, value)?;
        self.regs.set_sp(sp);
        Ok(())
    }

    /// Pop a byte: read at SP, then increment SP.
    pub fn pop_byte(&mut self) -> Result<u8, CpuError> {
        let sp = self.regs.sp();
        let next = sp.checked_add(1).ok_or(CpuError::StackUnderflow)?;
        let value = self.mem.read(sp as usize)?;
        self.regs.set_sp(next);
        Ok(value)
    }

    /// One-line hex dump of PC, the next three bytes, and R0-R7.
    pub fn trace_line(&self) -> String {
        let pc = self.regs.pc;
        let byte = |offset: usize| self.mem.read(pc + offset).unwrap_or(0);

        let mut line = format!(
            "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
            pc,
            byte(0),
            byte(1),
            byte(2)
        );
        for i in 0..REGISTER_COUNT {
            line.push_str(&format!(" {:02X}", self.regs.gpr()[i]));
        }
        line
    }

    /// Get the last executed instruction.
    pub fn last_opcode(&self) -> Option<Opcode> {
        self.last_opcode
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// Check if the CPU stopped on a fault.
    pub fn is_faulted(&self) -> bool {
        self.state == CpuState::Faulted
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("register error: {0}")]
    Register(#[from] RegisterError),

    #[error("invalid instruction {opcode:#04x} at PC={pc:#04x}")]
    InvalidInstruction { opcode: u8, pc: usize },

    #[error("unsupported ALU operation for opcode {0:#04x}")]
    UnsupportedAluOperation(u8),

    #[error("stack overflow: push with SP at address 0")]
    StackOverflow,

    #[error("stack underflow: pop with SP at address 0xFF")]
    StackUnderflow,

    #[error("return address {0:#x} does not fit in a byte")]
    ReturnAddressOutOfRange(usize),

    #[error("output error: {0}")]
    Output(String),
}

impl CpuError {
    /// Whether the fault is a register index or memory address outside the machine.
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            CpuError::Memory(MemoryError::AddressOutOfRange(_)) | CpuError::Register(_)
        )
    }
}
