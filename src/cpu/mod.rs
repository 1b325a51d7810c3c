//! CPU emulation for the LS-8.
//!
//! This module implements the complete LS-8 machine:
//! - 256 bytes of memory shared by program and stack
//! - 8 general purpose registers (R7 is the stack pointer), PC and FL
//! - a table-driven fetch-decode-execute loop

pub mod memory;
pub mod registers;
pub mod decode;
pub mod dispatch;
pub mod handlers;
pub mod execute;

pub use memory::{Memory, MemoryError};
pub use registers::{Registers, RegisterError};
pub use decode::{Opcode, DecodeError};
pub use execute::{Cpu, CpuError, CpuState};
