//! Opcode dispatch table.
//!
//! Maps every opcode byte to its handler. The table is built once, on first
//! use, and shared by every `Cpu`.

use std::io::Write;
use std::sync::OnceLock;

use crate::cpu::decode::Opcode;
use crate::cpu::execute::{Cpu, CpuError};
use crate::cpu::handlers;

/// An instruction handler. Reads its own operands relative to the PC.
pub type Handler = fn(&mut Cpu, &mut dyn Write) -> Result<(), CpuError>;

/// A populated slot of the dispatch table.
#[derive(Clone, Copy)]
pub struct Entry {
    pub opcode: Opcode,
    pub handler: Handler,
}

/// Opcode byte → handler lookup.
pub struct DispatchTable {
    entries: [Option<Entry>; 256],
}

impl DispatchTable {
    fn new() -> Self {
        let mut table = Self { entries: [None; 256] };

        table.register(Opcode::Hlt, handlers::hlt);
        table.register(Opcode::Ldi, handlers::ldi);
        table.register(Opcode::Prn, handlers::prn);
        table.register(Opcode::Add, handlers::alu);
        table.register(Opcode::Mul, handlers::alu);
        table.register(Opcode::Cmp, handlers::alu);
        table.register(Opcode::Push, handlers::push);
        table.register(Opcode::Pop, handlers::pop);
        table.register(Opcode::Call, handlers::call);
        table.register(Opcode::Ret, handlers::ret);
        table.register(Opcode::Jmp, handlers::jmp);
        table.register(Opcode::Jeq, handlers::jeq);
        table.register(Opcode::Jne, handlers::jne);

        table
    }

    fn register(&mut self, opcode: Opcode, handler: Handler) {
        self.entries[opcode.to_byte() as usize] = Some(Entry { opcode, handler });
    }

    /// Find the handler for an opcode byte.
    #[inline]
    pub fn lookup(&self, byte: u8) -> Option<Entry> {
        self.entries[byte as usize]
    }
}

/// The process-wide dispatch table.
pub fn table() -> &'static DispatchTable {
    static TABLE: OnceLock<DispatchTable> = OnceLock::new();
    TABLE.get_or_init(DispatchTable::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::decode;

    #[test]
    fn test_every_opcode_has_a_handler() {
        let table = table();
        let populated = (0..=u8::MAX).filter(|&b| table.lookup(b).is_some()).count();
        assert_eq!(populated, Opcode::ALL.len());

        for op in Opcode::ALL {
            let entry = table.lookup(op.to_byte()).expect("missing handler");
            assert_eq!(entry.opcode, op);
        }
    }

    #[test]
    fn test_table_agrees_with_decoder() {
        let table = table();
        for byte in 0..=u8::MAX {
            assert_eq!(
                table.lookup(byte).map(|e| e.opcode),
                decode(byte).ok(),
                "byte {byte:#04x}"
            );
        }
    }

    #[test]
    fn test_unknown_bytes_have_no_handler() {
        let table = table();
        assert!(table.lookup(0x00).is_none());
        assert!(table.lookup(0xFF).is_none());
    }
}
