//! # LS-8 Emulator
//!
//! An emulator for the LS-8, a small 8-bit computer with eight registers
//! and 256 bytes of memory.
//!
//! Programs are text files of binary byte literals, one per line, loaded at
//! address 0 and run until `HLT`. `PRN` is the only instruction that
//! produces output.

pub mod cpu;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Opcode};
pub use asm::{assemble, disassemble, AssemblerError, LoadError, Program, load_program_file, parse_program, save_program};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
