//! LS-8 memory subsystem.
//!
//! A single flat 256-byte address space holds both the program image
//! (loaded at address 0) and the stack, which grows down from 0xF4.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of addressable bytes.
pub const MEMORY_SIZE: usize = 256;

/// LS-8 memory: 256 bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MemoryImage")]
pub struct Memory {
    cells: Vec<u8>,
}

/// Serialized form of `Memory`, checked for size before use.
#[derive(Deserialize)]
struct MemoryImage {
    cells: Vec<u8>,
}

impl TryFrom<MemoryImage> for Memory {
    type Error = MemoryError;

    fn try_from(image: MemoryImage) -> Result<Self, Self::Error> {
        if image.cells.len() != MEMORY_SIZE {
            return Err(MemoryError::BadImageSize(image.cells.len()));
        }
        Ok(Self { cells: image.cells })
    }
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read the byte at `addr` (0-255).
    #[inline]
    pub fn read(&self, addr: usize) -> Result<u8, MemoryError> {
        self.cells
            .get(addr)
            .copied()
            .ok_or(MemoryError::AddressOutOfRange(addr))
    }

    /// Write `value` at `addr` (0-255).
    #[inline]
    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), MemoryError> {
        let cell = self.cells
            .get_mut(addr)
            .ok_or(MemoryError::AddressOutOfRange(addr))?;
        *cell = value;
        Ok(())
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy a program image into memory starting at `start_addr`.
    pub fn load_program(&mut self, start_addr: usize, program: &[u8]) -> Result<(), MemoryError> {
        if start_addr > MEMORY_SIZE {
            return Err(MemoryError::AddressOutOfRange(start_addr));
        }

        let available = MEMORY_SIZE - start_addr;
        if program.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available,
            });
        }

        self.cells
            .get_mut(start_addr..start_addr + program.len())
            .ok_or(MemoryError::AddressOutOfRange(start_addr))?
            .copy_from_slice(program);
        Ok(())
    }

    /// The whole address space as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&b| b != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory address {0} out of range (0-255)")]
    AddressOutOfRange(usize),

    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },

    #[error("memory image has {0} cells, expected 256")]
    BadImageSize(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        mem.write(10, 42).unwrap();
        assert_eq!(mem.read(10).unwrap(), 42);
        assert_eq!(mem.read(11).unwrap(), 0);
    }

    #[test]
    fn test_memory_bounds() {
        let mut mem = Memory::new();

        assert!(mem.read(0).is_ok());
        assert!(mem.read(255).is_ok());

        assert_eq!(mem.read(256), Err(MemoryError::AddressOutOfRange(256)));
        assert_eq!(mem.write(300, 1), Err(MemoryError::AddressOutOfRange(300)));
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();
        mem.load_program(0, &[0x82, 0x00, 0x08]).unwrap();

        assert_eq!(mem.read(0).unwrap(), 0x82);
        assert_eq!(mem.read(1).unwrap(), 0x00);
        assert_eq!(mem.read(2).unwrap(), 0x08);
    }

    #[test]
    fn test_load_program_too_large() {
        let mut mem = Memory::new();
        let image = vec![1u8; MEMORY_SIZE + 1];

        assert_eq!(
            mem.load_program(0, &image),
            Err(MemoryError::ProgramTooLarge { size: 257, available: 256 })
        );

        // A full image fits exactly.
        assert!(mem.load_program(0, &image[..MEMORY_SIZE]).is_ok());
    }

    #[test]
    fn test_load_past_end_of_memory() {
        let mut mem = Memory::new();
        assert_eq!(mem.load_program(300, &[]), Err(MemoryError::AddressOutOfRange(300)));
        assert_eq!(
            mem.load_program(250, &[0; 7]),
            Err(MemoryError::ProgramTooLarge { size: 7, available: 6 })
        );
        assert!(mem.load_program(MEMORY_SIZE, &[]).is_ok());
    }

    #[test]
    fn test_image_size_checked_on_deserialize() {
        let json = serde_json::to_string(&Memory::new()).unwrap();
        let restored: Memory = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, Memory::new());

        let err = serde_json::from_str::<Memory>(r#"{"cells":[1,2]}"#).unwrap_err();
        assert!(err.to_string().contains("memory image has 2 cells"));

        let oversized = format!(r#"{{"cells":{:?}}}"#, vec![0u8; MEMORY_SIZE + 1]);
        assert!(serde_json::from_str::<Memory>(&oversized).is_err());
    }
}
