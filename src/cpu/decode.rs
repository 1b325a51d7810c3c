//! Instruction decoder for the LS-8.
//!
//! Every instruction starts with a one-byte opcode laid out as `AABCDDDD`:
//! - `AA`: number of operand bytes that follow (0-2)
//! - `B`: set for ALU operations
//! - `C`: set for instructions that move the PC themselves
//! - `DDDD`: instruction identifier

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// An LS-8 opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Control ====================

    /// Halt the CPU
    Hlt = 0b0000_0001,

    // ==================== Data ====================

    /// Load immediate: R[a] := b
    Ldi = 0b1000_0010,

    /// Print R[a] as a decimal number
    Prn = 0b0100_0111,

    // ==================== ALU ====================

    /// R[a] := R[a] + R[b]
    Add = 0b1010_0000,

    /// R[a] := R[a] * R[b]
    Mul = 0b1010_0010,

    /// Compare R[a] with R[b], setting FL
    Cmp = 0b1010_0111,

    // ==================== Stack ====================

    /// Push R[a] onto the stack
    Push = 0b0100_0101,

    /// Pop the top of the stack into R[a]
    Pop = 0b0100_0110,

    // ==================== Subroutines & Jumps ====================

    /// Push the return address and jump to R[a]
    Call = 0b0101_0000,

    /// Pop the return address into PC
    Ret = 0b0001_0001,

    /// PC := R[a]
    Jmp = 0b0101_0100,

    /// If E is set, PC := R[a]
    Jeq = 0b0101_0101,

    /// If E is clear, PC := R[a]
    Jne = 0b0101_0110,
}

impl Opcode {
    /// Every opcode the machine implements.
    pub const ALL: [Opcode; 13] = [
        Opcode::Hlt,
        Opcode::Ldi,
        Opcode::Prn,
        Opcode::Add,
        Opcode::Mul,
        Opcode::Cmp,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Call,
        Opcode::Ret,
        Opcode::Jmp,
        Opcode::Jeq,
        Opcode::Jne,
    ];

    /// The raw byte.
    #[inline]
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    /// Number of operand bytes that follow this opcode.
    #[inline]
    pub const fn operand_count(self) -> usize {
        operand_count(self as u8)
    }

    /// Total instruction length in bytes.
    #[inline]
    pub const fn instruction_len(self) -> usize {
        self.operand_count() + 1
    }

    /// Whether the instruction is executed by the ALU.
    pub const fn is_alu(self) -> bool {
        matches!(self, Opcode::Add | Opcode::Mul | Opcode::Cmp)
    }

    /// Whether the handler owns the PC (no auto-advance afterwards).
    pub const fn sets_pc(self) -> bool {
        matches!(
            self,
            Opcode::Call | Opcode::Ret | Opcode::Jmp | Opcode::Jeq | Opcode::Jne
        )
    }

    /// Assembly mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Hlt => "HLT",
            Opcode::Ldi => "LDI",
            Opcode::Prn => "PRN",
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
            Opcode::Cmp => "CMP",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Jmp => "JMP",
            Opcode::Jeq => "JEQ",
            Opcode::Jne => "JNE",
        }
    }

    /// Look an opcode up by mnemonic (case-insensitive). `MULT` is accepted for `MUL`.
    pub fn from_mnemonic(name: &str) -> Option<Opcode> {
        let upper = name.to_ascii_uppercase();
        if upper == "MULT" {
            return Some(Opcode::Mul);
        }
        if upper == "HALT" {
            return Some(Opcode::Hlt);
        }
        Opcode::ALL.into_iter().find(|op| op.mnemonic() == upper)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        decode(byte)
    }
}

/// Number of operand bytes encoded in the top two bits of an opcode byte.
#[inline]
pub const fn operand_count(byte: u8) -> usize {
    (byte >> 6) as usize
}

/// Decode an opcode byte.
pub fn decode(byte: u8) -> Result<Opcode, DecodeError> {
    let opcode = match byte {
        0b0000_0001 => Opcode::Hlt,
        0b1000_0010 => Opcode::Ldi,
        0b0100_0111 => Opcode::Prn,
        0b1010_0000 => Opcode::Add,
        0b1010_0010 => Opcode::Mul,
        0b1010_0111 => Opcode::Cmp,
        0b0100_0101 => Opcode::Push,
        0b0100_0110 => Opcode::Pop,
        0b0101_0000 => Opcode::Call,
        0b0001_0001 => Opcode::Ret,
        0b0101_0100 => Opcode::Jmp,
        0b0101_0101 => Opcode::Jeq,
        0b0101_0110 => Opcode::Jne,
        _ => return Err(DecodeError::InvalidOpcode(byte)),
    };

    Ok(opcode)
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_bytes() {
        assert_eq!(decode(0x01), Ok(Opcode::Hlt));
        assert_eq!(decode(0x82), Ok(Opcode::Ldi));
        assert_eq!(decode(0x47), Ok(Opcode::Prn));
        assert_eq!(decode(0xA2), Ok(Opcode::Mul));
        assert_eq!(decode(0x50), Ok(Opcode::Call));
        assert_eq!(decode(0x11), Ok(Opcode::Ret));
    }

    #[test]
    fn test_decode_every_byte() {
        for byte in 0..=u8::MAX {
            match decode(byte) {
                Ok(op) => assert_eq!(op.to_byte(), byte),
                Err(DecodeError::InvalidOpcode(b)) => {
                    assert_eq!(b, byte);
                    assert!(!Opcode::ALL.iter().any(|op| op.to_byte() == byte));
                }
            }
        }
    }

    #[test]
    fn test_operand_counts() {
        assert_eq!(Opcode::Hlt.operand_count(), 0);
        assert_eq!(Opcode::Ret.operand_count(), 0);
        assert_eq!(Opcode::Prn.operand_count(), 1);
        assert_eq!(Opcode::Push.operand_count(), 1);
        assert_eq!(Opcode::Jne.operand_count(), 1);
        assert_eq!(Opcode::Ldi.operand_count(), 2);
        assert_eq!(Opcode::Cmp.operand_count(), 2);
        assert_eq!(Opcode::Ldi.instruction_len(), 3);
    }

    #[test]
    fn test_classification_matches_encoding() {
        for op in Opcode::ALL {
            let byte = op.to_byte();
            assert_eq!(op.is_alu(), byte & 0b0010_0000 != 0, "{op}");
            assert_eq!(op.sets_pc(), byte & 0b0001_0000 != 0, "{op}");
        }
    }

    #[test]
    fn test_mnemonic_lookup() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_mnemonic("mult"), Some(Opcode::Mul));
        assert_eq!(Opcode::from_mnemonic("halt"), Some(Opcode::Hlt));
        assert_eq!(Opcode::from_mnemonic("NOP"), None);
    }
}
