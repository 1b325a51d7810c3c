//! WebAssembly bindings for the LS-8 emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::{Cpu, assemble, parse_program};
use crate::asm::disasm::disassemble_instruction;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    program: Vec<u8>,
    output: Vec<u8>,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            program: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Load a program from `.ls8` source text. Returns its size in bytes.
    #[wasm_bindgen]
    pub fn load_ls8(&mut self, source: &str) -> Result<usize, JsError> {
        let program = parse_program(source)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.load_bytes(program.bytes)
    }

    /// Load a program from assembly source code. Returns its size in bytes.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let bytes = assemble(source)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.load_bytes(bytes)
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let pc = self.cpu.regs.pc;
        let bytes = self.cpu.mem.as_slice();
        let listing = disassemble_instruction(&bytes[pc.min(bytes.len())..(pc + 3).min(bytes.len())]);

        self.cpu.step(&mut self.output)
            .map_err(|e| JsError::new(&e.to_string()))?;

        Ok(listing)
    }

    /// Run until halt, fault or `max_cycles` instructions. Returns the total cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.cpu.run_limited(&mut self.output, max_cycles as u64)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(self.cpu.cycles)
    }

    /// Reset CPU to initial state with loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsError> {
        let program = std::mem::take(&mut self.program);
        self.load_bytes(program)?;
        Ok(())
    }

    /// Everything the program has printed so far.
    #[wasm_bindgen]
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Check if CPU is running.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    /// Check if CPU is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> usize {
        self.cpu.regs.pc
    }

    /// Get flags register.
    #[wasm_bindgen]
    pub fn flags(&self) -> u8 {
        self.cpu.regs.fl
    }

    /// Get register `index` (0-7).
    #[wasm_bindgen]
    pub fn register(&self, index: u8) -> Result<u8, JsError> {
        self.cpu.regs.get(index)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// Get all 256 bytes of memory.
    #[wasm_bindgen]
    pub fn memory_all(&self) -> Vec<u8> {
        self.cpu.mem.as_slice().to_vec()
    }

    /// Full machine state as JSON.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu)
            .map_err(|e| JsError::new(&e.to_string()))
    }
}

impl WasmCpu {
    fn load_bytes(&mut self, bytes: Vec<u8>) -> Result<usize, JsError> {
        let mut cpu = Cpu::new();
        cpu.load_program(&bytes)
            .map_err(|e| JsError::new(&e.to_string()))?;

        let len = bytes.len();
        self.cpu = cpu;
        self.program = bytes;
        self.output.clear();
        Ok(len)
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the program size in bytes.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<usize, JsError> {
    let bytes = assemble(source)
        .map_err(|e| JsError::new(&e.to_string()))?;
    Ok(bytes.len())
}

/// Disassemble one instruction given as up to three bytes.
#[wasm_bindgen]
pub fn wasm_disassemble(bytes: &[u8]) -> String {
    disassemble_instruction(bytes)
}
