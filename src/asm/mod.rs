//! Program tooling for the LS-8.
//!
//! This module provides:
//! - The `.ls8` loader (binary text → program image)
//! - A two-pass assembler (mnemonics → program image)
//! - A disassembler (program image → readable text)

pub mod assembler;
pub mod disasm;
pub mod loader;

pub use assembler::{assemble, AssemblerError};
pub use disasm::disassemble;
pub use loader::{Program, LoadError, parse_program, load_program_file, save_program};
