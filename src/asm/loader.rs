//! `.ls8` program file format.
//!
//! A `.ls8` file is plain text:
//! - One byte per line, written as 8 binary digits
//! - `#` starts a comment that runs to the end of the line
//! - Lines that do not begin with `0` or `1` are ignored

use std::io::Write;
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::asm::disasm::{disassemble_instruction, instruction_starts};
use crate::cpu::memory::MEMORY_SIZE;

/// A parsed program image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// The bytes to load at address 0.
    pub bytes: Vec<u8>,
}

impl Program {
    /// Create a new empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a byte.
    pub fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Get the number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Parse `.ls8` source text into a program image.
pub fn parse_program(source: &str) -> Result<Program, LoadError> {
    let mut program = Program::new();

    for (line_num, line) in source.lines().enumerate() {
        let code = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let code = code.trim();

        if !code.starts_with(['0', '1']) {
            continue;
        }

        let token = code.split_whitespace().next().unwrap_or_default();
        if token.len() != 8 || !token.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(LoadError::ParseError {
                line: line_num + 1,
                message: format!("expected 8 binary digits, found {:?}", token),
            });
        }

        let byte = u8::from_str_radix(token, 2).map_err(|e| LoadError::ParseError {
            line: line_num + 1,
            message: e.to_string(),
        })?;

        program.push(byte);
    }

    if program.len() > MEMORY_SIZE {
        return Err(LoadError::TooLarge { size: program.len() });
    }

    Ok(program)
}

/// Load a `.ls8` file from disk.
pub fn load_program_file<P: AsRef<Path>>(path: P) -> Result<Program, LoadError> {
    let source = std::fs::read_to_string(path.as_ref())
        .map_err(|e| LoadError::IoError(e.to_string()))?;
    let program = parse_program(&source)?;
    debug!("parsed {} bytes from {}", program.len(), path.as_ref().display());
    Ok(program)
}

/// Render a program image as `.ls8` text, annotating each instruction.
pub fn format_program(bytes: &[u8]) -> String {
    let mut text = String::new();
    text.push_str("# LS-8 program\n");
    text.push_str(&format!("# {} bytes\n\n", bytes.len()));

    for (addr, len) in instruction_starts(bytes) {
        let chunk = &bytes[addr..addr + len];
        let listing = disassemble_instruction(chunk);

        for (i, byte) in chunk.iter().enumerate() {
            if i == 0 {
                text.push_str(&format!("{:08b} # {:02X}: {}\n", byte, addr, listing));
            } else {
                text.push_str(&format!("{:08b}\n", byte));
            }
        }
    }

    text
}

/// Save a program image as a `.ls8` file.
pub fn save_program<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), LoadError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| LoadError::IoError(e.to_string()))?;

    file.write_all(format_program(bytes).as_bytes())
        .map_err(|e| LoadError::IoError(e.to_string()))?;

    Ok(())
}

/// Errors that can occur while loading or saving programs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("program is {size} bytes, memory holds 256")]
    TooLarge { size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRINT8: &str = "\
# print8.ls8: Print the number 8 on the screen

10000010 # LDI R0,8
00000000
00001000
01000111 # PRN R0
00000000
00000001 # HLT
";

    #[test]
    fn test_parse_print8() {
        let program = parse_program(PRINT8).unwrap();
        assert_eq!(program.bytes, vec![0x82, 0x00, 0x08, 0x47, 0x00, 0x01]);
    }

    #[test]
    fn test_skips_blank_and_non_binary_lines() {
        let source = "\n   \n# comment only\n  00000001   \nnotes here\n";
        let program = parse_program(source).unwrap();
        assert_eq!(program.bytes, vec![0x01]);
        assert!(parse_program("# nothing to run\n").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_short_literal() {
        let err = parse_program("00000001\n0101 # too short\n").unwrap_err();
        assert_eq!(err, LoadError::ParseError {
            line: 2,
            message: "expected 8 binary digits, found \"0101\"".into(),
        });
    }

    #[test]
    fn test_rejects_non_binary_digit() {
        assert!(matches!(
            parse_program("10000012\n"),
            Err(LoadError::ParseError { line: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_oversized_image() {
        let source = "00000000\n".repeat(MEMORY_SIZE + 1);
        assert_eq!(parse_program(&source), Err(LoadError::TooLarge { size: 257 }));

        let source = "00000000\n".repeat(MEMORY_SIZE);
        assert_eq!(parse_program(&source).unwrap().len(), MEMORY_SIZE);
    }

    #[test]
    fn test_format_parses_back() {
        let bytes = [0x82, 0x00, 0x08, 0x47, 0x00, 0x01];
        let text = format_program(&bytes);
        assert!(text.contains("10000010 # 00: LDI R0,8"));
        assert!(text.contains("00000001 # 05: HLT"));
        assert_eq!(parse_program(&text).unwrap().bytes, bytes);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_program_file("/nonexistent/program.ls8"),
            Err(LoadError::IoError(_))
        ));
    }
}
