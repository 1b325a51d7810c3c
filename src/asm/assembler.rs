//! Simple assembler for LS-8 programs.
//!
//! Syntax:
//! ```text
//! ; Comment (`#` works too)
//! MAIN:               ; Define a label
//!     LDI R0, 8       ; Register, immediate
//!     LDI R1, PRINT   ; Labels resolve to addresses
//!     CALL R1
//!     HLT
//! PRINT:
//!     PRN R0
//!     RET
//!     DB 0x2A, 7      ; Raw data bytes
//! ```

use std::collections::HashMap;

use thiserror::Error;

use crate::cpu::decode::Opcode;
use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::registers::{REGISTER_COUNT, SP};

/// Assemble source code to a program image.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// The assembler state.
struct Assembler {
    /// Symbol table (label -> address).
    symbols: HashMap<String, u8>,
    /// Unresolved label references: (output index, label, source line).
    pending: Vec<(usize, String, usize)>,
    /// Output bytes.
    output: Vec<u8>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        // Pass 1: Collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        if self.output.len() > MEMORY_SIZE {
            return Err(AssemblerError::TooLarge { size: self.output.len() });
        }

        // Pass 2: Resolve forward references
        self.resolve_references()?;

        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let line = match line.find([';', '#']) {
            Some(idx) => &line[..idx],
            None => line,
        };
        let mut line = line.trim();

        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            self.define_label(label, line_num)?;
            line = line[colon_idx + 1..].trim();
        }

        if line.is_empty() {
            return Ok(());
        }

        self.process_instruction(line, line_num)
    }

    fn define_label(&mut self, label: String, line_num: usize) -> Result<(), AssemblerError> {
        if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid label {:?}", label),
            });
        }

        let addr = u8::try_from(self.output.len()).map_err(|_| AssemblerError::TooLarge {
            size: self.output.len(),
        })?;

        if self.symbols.insert(label.clone(), addr).is_some() {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("duplicate label {}", label),
            });
        }
        Ok(())
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((m, rest)) => (m, rest.trim()),
            None => (line, ""),
        };
        let operands: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };
        let mnemonic = mnemonic.to_uppercase();

        if mnemonic == "DB" {
            if operands.is_empty() {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: "DB requires at least one value".into(),
                });
            }
            for operand in operands {
                let value = self.parse_immediate(operand, line_num)?;
                self.output.push(value);
            }
            return Ok(());
        }

        let op = Opcode::from_mnemonic(&mnemonic).ok_or_else(|| AssemblerError::UnknownMnemonic {
            line: line_num,
            mnemonic: mnemonic.clone(),
        })?;

        if operands.len() != op.operand_count() {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!(
                    "{} takes {} operand(s), found {}",
                    op,
                    op.operand_count(),
                    operands.len()
                ),
            });
        }

        self.output.push(op.to_byte());

        match op {
            Opcode::Ldi => {
                let reg = parse_register(operands[0], line_num)?;
                let value = self.parse_immediate(operands[1], line_num)?;
                self.output.push(reg);
                self.output.push(value);
            }
            _ => {
                for operand in operands {
                    let reg = parse_register(operand, line_num)?;
                    self.output.push(reg);
                }
            }
        }

        Ok(())
    }

    /// Parse a byte value. Labels are recorded for pass 2 and emit a placeholder.
    fn parse_immediate(&mut self, operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let parsed = if let Some(hex) = operand.strip_prefix("0x").or_else(|| operand.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).ok()
        } else if let Some(bin) = operand.strip_prefix("0b").or_else(|| operand.strip_prefix("0B")) {
            i64::from_str_radix(bin, 2).ok()
        } else if operand.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
            operand.parse::<i64>().ok()
        } else {
            // Must be a label reference
            let out_idx = self.output.len();
            self.pending.push((out_idx, operand.to_uppercase(), line_num));
            return Ok(0);
        };

        let value = parsed.ok_or_else(|| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid number {:?}", operand),
        })?;

        u8::try_from(value).map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (out_idx, label, line_num) in &self.pending {
            let addr = self.symbols.get(label).ok_or_else(|| AssemblerError::UndefinedLabel {
                line: *line_num,
                label: label.clone(),
            })?;
            self.output[*out_idx] = *addr;
        }
        Ok(())
    }
}

/// Parse `R0`-`R7` (or `SP` for R7).
fn parse_register(operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
    let upper = operand.to_uppercase();
    if upper == "SP" {
        return Ok(SP);
    }

    upper
        .strip_prefix('R')
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|&n| (n as usize) < REGISTER_COUNT)
        .ok_or_else(|| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("expected register R0-R7, found {:?}", operand),
        })
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },

    #[error("program is {size} bytes, memory holds 256")]
    TooLarge { size: usize },
}
