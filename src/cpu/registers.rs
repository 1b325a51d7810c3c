//! LS-8 CPU registers.
//!
//! The LS-8 has:
//! - R0-R7: eight 8-bit general purpose registers (R7 doubles as SP)
//! - PC: program counter, an index into memory
//! - FL: flags register, written by CMP

use serde::{Serialize, Deserialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// Register index reserved for the stack pointer.
pub const SP: u8 = 7;

/// Value of SP when the stack is empty.
pub const STACK_EMPTY: u8 = 0xF4;

/// `FL` bit set when the last comparison was equal.
pub const FLAG_EQUAL: u8 = 0b0000_0001;
/// `FL` bit set when register A was greater than register B.
pub const FLAG_GREATER: u8 = 0b0000_0010;
/// `FL` bit set when register A was less than register B.
pub const FLAG_LESS: u8 = 0b0000_0100;

/// The LS-8 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    gpr: [u8; REGISTER_COUNT],

    /// PC: address of the next byte to fetch
    pub pc: usize,

    /// FL: `00000LGE`
    pub fl: u8,
}

impl Registers {
    /// Create a register file in its power-on state.
    pub fn new() -> Self {
        let mut gpr = [0; REGISTER_COUNT];
        gpr[SP as usize] = STACK_EMPTY;
        Self { gpr, pc: 0, fl: 0 }
    }

    /// Restore the power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read register `index` (0-7).
    #[inline]
    pub fn get(&self, index: u8) -> Result<u8, RegisterError> {
        self.gpr
            .get(index as usize)
            .copied()
            .ok_or(RegisterError::IndexOutOfRange(index))
    }

    /// Write register `index` (0-7).
    #[inline]
    pub fn set(&mut self, index: u8, value: u8) -> Result<(), RegisterError> {
        let reg = self.gpr
            .get_mut(index as usize)
            .ok_or(RegisterError::IndexOutOfRange(index))?;
        *reg = value;
        Ok(())
    }

    /// All eight general purpose registers.
    pub fn gpr(&self) -> &[u8; REGISTER_COUNT] {
        &self.gpr
    }

    /// The stack pointer (R7).
    #[inline]
    pub fn sp(&self) -> u8 {
        self.gpr[SP as usize]
    }

    #[inline]
    pub fn set_sp(&mut self, value: u8) {
        self.gpr[SP as usize] = value;
    }

    /// Advance the program counter by `len` bytes.
    /// Returns the old value.
    pub fn advance_pc(&mut self, len: usize) -> usize {
        let old = self.pc;
        self.pc += len;
        old
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: u8) {
        self.pc = addr as usize;
    }

    /// Record the outcome of a comparison of A against B.
    ///
    /// Exactly one of the three flag bits is set afterwards.
    pub fn set_compare(&mut self, ordering: Ordering) {
        self.fl = match ordering {
            Ordering::Equal => FLAG_EQUAL,
            Ordering::Greater => FLAG_GREATER,
            Ordering::Less => FLAG_LESS,
        };
    }

    pub fn equal(&self) -> bool {
        self.fl & FLAG_EQUAL != 0
    }

    pub fn greater(&self) -> bool {
        self.fl & FLAG_GREATER != 0
    }

    pub fn less(&self) -> bool {
        self.fl & FLAG_LESS != 0
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from register file access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("register index {0} out of range (0-7)")]
    IndexOutOfRange(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_state() {
        let regs = Registers::new();
        assert_eq!(regs.pc, 0);
        assert_eq!(regs.fl, 0);
        assert_eq!(regs.sp(), 0xF4);
        for i in 0..7 {
            assert_eq!(regs.get(i).unwrap(), 0);
        }
    }

    #[test]
    fn test_register_bounds() {
        let mut regs = Registers::new();
        regs.set(3, 99).unwrap();
        assert_eq!(regs.get(3).unwrap(), 99);

        assert_eq!(regs.get(8), Err(RegisterError::IndexOutOfRange(8)));
        assert_eq!(regs.set(255, 1), Err(RegisterError::IndexOutOfRange(255)));
    }

    #[test]
    fn test_sp_is_r7() {
        let mut regs = Registers::new();
        regs.set(7, 0x10).unwrap();
        assert_eq!(regs.sp(), 0x10);

        regs.set_sp(0x20);
        assert_eq!(regs.get(7).unwrap(), 0x20);
    }

    #[test]
    fn test_compare_flags() {
        let mut regs = Registers::new();

        regs.set_compare(Ordering::Equal);
        assert_eq!(regs.fl, 0b001);
        assert!(regs.equal() && !regs.greater() && !regs.less());

        regs.set_compare(Ordering::Greater);
        assert_eq!(regs.fl, 0b010);
        assert!(!regs.equal() && regs.greater() && !regs.less());

        regs.set_compare(Ordering::Less);
        assert_eq!(regs.fl, 0b100);
        assert!(!regs.equal() && !regs.greater() && regs.less());
    }

    #[test]
    fn test_advance_pc() {
        let mut regs = Registers::new();
        regs.pc = 10;

        let old = regs.advance_pc(3);
        assert_eq!(old, 10);
        assert_eq!(regs.pc, 13);

        regs.jump(0xF0);
        assert_eq!(regs.pc, 0xF0);
    }
}
