//! Disassembler for LS-8 programs.
//!
//! Converts program bytes back to readable assembly.

use crate::cpu::decode::{decode, Opcode};

/// Disassemble the instruction at the start of `bytes`.
///
/// Bytes that are not opcodes come out as `DB 0xNN` data.
pub fn disassemble_instruction(bytes: &[u8]) -> String {
    let Some(&first) = bytes.first() else {
        return String::new();
    };

    match decode(first) {
        Ok(op) => format_instruction(op, &bytes[1..]),
        Err(_) => format!("DB {:#04x}", first),
    }
}

/// Disassemble a whole program image into an address-prefixed listing.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; LS-8 Disassembly\n");
    output.push_str("; -----------------\n\n");

    for (addr, len) in instruction_starts(bytes) {
        let chunk = &bytes[addr..addr + len];
        let raw: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        output.push_str(&format!(
            "{:02X}: {:<14} ; {}\n",
            addr,
            disassemble_instruction(chunk),
            raw.join(" ")
        ));
    }

    output
}

/// `(address, length)` of each instruction in a linear sweep of `bytes`.
pub fn instruction_starts(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut starts = Vec::new();
    let mut addr = 0;
    while addr < bytes.len() {
        let len = match decode(bytes[addr]) {
            Ok(op) => op.instruction_len().min(bytes.len() - addr),
            Err(_) => 1,
        };
        starts.push((addr, len));
        addr += len;
    }
    starts
}

/// Format a decoded instruction as assembly text.
fn format_instruction(op: Opcode, operands: &[u8]) -> String {
    let reg = |i: usize| match operands.get(i) {
        Some(r) => format!("R{}", r),
        None => "?".to_string(),
    };

    match op {
        Opcode::Hlt | Opcode::Ret => op.mnemonic().to_string(),

        Opcode::Ldi => {
            let value = match operands.get(1) {
                Some(v) => v.to_string(),
                None => "?".to_string(),
            };
            format!("LDI {},{}", reg(0), value)
        }

        Opcode::Add | Opcode::Mul | Opcode::Cmp => {
            format!("{} {},{}", op.mnemonic(), reg(0), reg(1))
        }

        Opcode::Prn
        | Opcode::Push
        | Opcode::Pop
        | Opcode::Call
        | Opcode::Jmp
        | Opcode::Jeq
        | Opcode::Jne => format!("{} {}", op.mnemonic(), reg(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disassemble_hlt() {
        assert_eq!(disassemble_instruction(&[0x01]), "HLT");
    }

    #[test]
    fn test_disassemble_operands() {
        assert_eq!(disassemble_instruction(&[0x82, 0x00, 0x08]), "LDI R0,8");
        assert_eq!(disassemble_instruction(&[0xA2, 0x00, 0x01]), "MUL R0,R1");
        assert_eq!(disassemble_instruction(&[0x47, 0x03]), "PRN R3");
        assert_eq!(disassemble_instruction(&[0x50, 0x02]), "CALL R2");
    }

    #[test]
    fn test_disassemble_unknown_byte() {
        assert_eq!(disassemble_instruction(&[0xFF]), "DB 0xff");
        assert_eq!(disassemble_instruction(&[]), "");
    }

    #[test]
    fn test_disassemble_truncated() {
        assert_eq!(disassemble_instruction(&[0x82, 0x00]), "LDI R0,?");
    }

    #[test]
    fn test_listing() {
        let listing = disassemble(&[0x82, 0x00, 0x08, 0x47, 0x00, 0x01]);
        assert!(listing.contains("00: LDI R0,8"));
        assert!(listing.contains("03: PRN R0"));
        assert!(listing.contains("05: HLT"));
        assert!(listing.contains("; 82 00 08"));
    }

    #[test]
    fn test_instruction_starts() {
        assert_eq!(
            instruction_starts(&[0x82, 0x00, 0x08, 0xFF, 0x47, 0x00, 0x01]),
            vec![(0, 3), (3, 1), (4, 2), (6, 1)]
        );
    }
}
