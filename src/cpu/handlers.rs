//! Instruction handlers.
//!
//! One function per opcode. Each handler reads its operands from the bytes
//! following the PC and updates the machine. Handlers for opcodes whose
//! `sets_pc()` is true leave the PC pointing at the next instruction to run;
//! every other PC advance is done by the execution loop.

use std::io::Write;

use log::trace;

use crate::cpu::decode::Opcode;
use crate::cpu::execute::{Cpu, CpuError, CpuState};

/// Operation performed by the ALU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Mul,
    Cmp,
}

impl AluOp {
    /// The ALU operation selected by an opcode byte, if it is one.
    pub fn from_opcode(byte: u8) -> Option<Self> {
        match Opcode::try_from(byte).ok()? {
            Opcode::Add => Some(AluOp::Add),
            Opcode::Mul => Some(AluOp::Mul),
            Opcode::Cmp => Some(AluOp::Cmp),
            _ => None,
        }
    }
}

// ==================== Control ====================

pub fn hlt(cpu: &mut Cpu, _out: &mut dyn Write) -> Result<(), CpuError> {
    cpu.state = CpuState::Halted;
    Ok(())
}

// ==================== Data ====================

pub fn ldi(cpu: &mut Cpu, _out: &mut dyn Write) -> Result<(), CpuError> {
    let reg = cpu.operand(1)?;
    let value = cpu.operand(2)?;
    cpu.regs.set(reg, value)?;
    Ok(())
}

pub fn prn(cpu: &mut Cpu, out: &mut dyn Write) -> Result<(), CpuError> {
    let reg = cpu.operand(1)?;
    let value = cpu.regs.get(reg)?;
    writeln!(out, "{}", value).map_err(|e| CpuError::Output(e.to_string()))?;
    Ok(())
}

// ==================== ALU ====================

/// Shared handler for ADD, MUL and CMP.
///
/// The operation is chosen from the opcode byte at the PC, so the handler is
/// only valid for ALU opcodes; anything else aborts with
/// `UnsupportedAluOperation`.
pub fn alu(cpu: &mut Cpu, _out: &mut dyn Write) -> Result<(), CpuError> {
    let opcode = cpu.mem.read(cpu.regs.pc)?;
    let op = AluOp::from_opcode(opcode).ok_or(CpuError::UnsupportedAluOperation(opcode))?;

    let reg_a = cpu.operand(1)?;
    let reg_b = cpu.operand(2)?;
    let a = cpu.regs.get(reg_a)?;
    let b = cpu.regs.get(reg_b)?;

    match op {
        AluOp::Add => cpu.regs.set(reg_a, a.wrapping_add(b))?,
        AluOp::Mul => cpu.regs.set(reg_a, a.wrapping_mul(b))?,
        AluOp::Cmp => cpu.regs.set_compare(a.cmp(&b)),
    }

    Ok(())
}

// ==================== Stack ====================

pub fn push(cpu: &mut Cpu, _out: &mut dyn Write) -> Result<(), CpuError> {
    let reg = cpu.operand(1)?;
    let value = cpu.regs.get(reg)?;
    cpu.push_byte(value)
}

pub fn pop(cpu: &mut Cpu, _out: &mut dyn Write) -> Result<(), CpuError> {
    let reg = cpu.operand(1)?;
    // Validate the destination before touching the stack.
    cpu.regs.get(reg)?;
    let value = cpu.pop_byte()?;
    cpu.regs.set(reg, value)?;
    Ok(())
}

// ==================== Subroutines & Jumps ====================

pub fn call(cpu: &mut Cpu, _out: &mut dyn Write) -> Result<(), CpuError> {
    let reg = cpu.operand(1)?;
    let target = cpu.regs.get(reg)?;

    let return_addr = cpu.regs.pc + Opcode::Call.instruction_len();
    let return_addr = u8::try_from(return_addr)
        .map_err(|_| CpuError::ReturnAddressOutOfRange(return_addr))?;

    cpu.push_byte(return_addr)?;
    trace!("CALL {:#04x} (return to {:#04x})", target, return_addr);
    cpu.regs.jump(target);
    Ok(())
}

pub fn ret(cpu: &mut Cpu, _out: &mut dyn Write) -> Result<(), CpuError> {
    let addr = cpu.pop_byte()?;
    cpu.regs.jump(addr);
    Ok(())
}

pub fn jmp(cpu: &mut Cpu, _out: &mut dyn Write) -> Result<(), CpuError> {
    let reg = cpu.operand(1)?;
    let target = cpu.regs.get(reg)?;
    cpu.regs.jump(target);
    Ok(())
}

pub fn jeq(cpu: &mut Cpu, _out: &mut dyn Write) -> Result<(), CpuError> {
    let take = cpu.regs.equal();
    jump_if(cpu, Opcode::Jeq, take)
}

pub fn jne(cpu: &mut Cpu, _out: &mut dyn Write) -> Result<(), CpuError> {
    let take = !cpu.regs.equal();
    jump_if(cpu, Opcode::Jne, take)
}

fn jump_if(cpu: &mut Cpu, opcode: Opcode, take: bool) -> Result<(), CpuError> {
    let reg = cpu.operand(1)?;
    let target = cpu.regs.get(reg)?;
    if take {
        cpu.regs.jump(target);
    } else {
        cpu.regs.advance_pc(opcode.instruction_len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::dispatch::Handler;
    use crate::cpu::registers::{FLAG_EQUAL, FLAG_GREATER, FLAG_LESS, STACK_EMPTY};
    use std::io::sink;

    /// A CPU with `program` at address 0 and the PC at 0.
    fn cpu_with(program: &[u8]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(program).unwrap();
        cpu
    }

    #[test]
    fn test_ldi_sets_register() {
        let mut cpu = cpu_with(&[0x82, 0x03, 0x2A]);
        ldi(&mut cpu, &mut sink()).unwrap();
        assert_eq!(cpu.regs.get(3).unwrap(), 42);
        // The loop owns the advance.
        assert_eq!(cpu.regs.pc, 0);
    }

    #[test]
    fn test_ldi_bad_register() {
        let mut cpu = cpu_with(&[0x82, 0x08, 0x2A]);
        let err = ldi(&mut cpu, &mut sink()).unwrap_err();
        assert!(matches!(err, CpuError::Register(_)));
    }

    #[test]
    fn test_prn_writes_decimal_line() {
        let mut cpu = cpu_with(&[0x47, 0x01]);
        cpu.regs.set(1, 200).unwrap();

        let mut out = Vec::new();
        prn(&mut cpu, &mut out).unwrap();
        assert_eq!(out, b"200\n");
    }

    #[test]
    fn test_alu_add_and_mul_wrap() {
        let mut cpu = cpu_with(&[0xA0, 0x00, 0x01]);
        cpu.regs.set(0, 250).unwrap();
        cpu.regs.set(1, 10).unwrap();
        alu(&mut cpu, &mut sink()).unwrap();
        assert_eq!(cpu.regs.get(0).unwrap(), 4);
        assert_eq!(cpu.regs.get(1).unwrap(), 10);

        let mut cpu = cpu_with(&[0xA2, 0x00, 0x01]);
        cpu.regs.set(0, 8).unwrap();
        cpu.regs.set(1, 9).unwrap();
        alu(&mut cpu, &mut sink()).unwrap();
        assert_eq!(cpu.regs.get(0).unwrap(), 72);

        cpu.regs.set(0, 16).unwrap();
        cpu.regs.set(1, 17).unwrap();
        alu(&mut cpu, &mut sink()).unwrap();
        assert_eq!(cpu.regs.get(0).unwrap(), (16u16 * 17 % 256) as u8);
    }

    #[test]
    fn test_alu_cmp_flags() {
        let cases = [(5u8, 5u8, FLAG_EQUAL), (9, 3, FLAG_GREATER), (3, 9, FLAG_LESS)];
        for (a, b, expected) in cases {
            let mut cpu = cpu_with(&[0xA7, 0x00, 0x01]);
            cpu.regs.set(0, a).unwrap();
            cpu.regs.set(1, b).unwrap();
            alu(&mut cpu, &mut sink()).unwrap();
            assert_eq!(cpu.regs.fl, expected, "CMP {a} {b}");
        }
    }

    #[test]
    fn test_alu_rejects_non_alu_opcode() {
        // LDI routed to the ALU handler is a dispatch misconfiguration.
        let mut cpu = cpu_with(&[0x82, 0x00, 0x01]);
        let err = alu(&mut cpu, &mut sink()).unwrap_err();
        assert!(matches!(err, CpuError::UnsupportedAluOperation(0x82)));
        assert_eq!(cpu.regs.get(0).unwrap(), 0);
    }

    #[test]
    fn test_push_then_pop() {
        let mut cpu = cpu_with(&[0x45, 0x02]);
        cpu.regs.set(2, 0x77).unwrap();
        push(&mut cpu, &mut sink()).unwrap();

        assert_eq!(cpu.regs.sp(), STACK_EMPTY - 1);
        assert_eq!(cpu.mem.read(0xF3).unwrap(), 0x77);

        cpu.mem.write(1, 0x04).unwrap();
        pop(&mut cpu, &mut sink()).unwrap();
        assert_eq!(cpu.regs.get(4).unwrap(), 0x77);
        assert_eq!(cpu.regs.sp(), STACK_EMPTY);
    }

    #[test]
    fn test_push_overflow_at_address_zero() {
        let mut cpu = cpu_with(&[0x45, 0x00]);
        cpu.regs.set_sp(0);
        let err = push(&mut cpu, &mut sink()).unwrap_err();
        assert!(matches!(err, CpuError::StackOverflow));
        assert_eq!(cpu.regs.sp(), 0);
    }

    #[test]
    fn test_pop_underflow_at_top_of_memory() {
        let mut cpu = cpu_with(&[0x46, 0x00]);
        cpu.regs.set_sp(0xFF);
        let err = pop(&mut cpu, &mut sink()).unwrap_err();
        assert!(matches!(err, CpuError::StackUnderflow));
    }

    #[test]
    fn test_call_pushes_return_address() {
        let mut cpu = cpu_with(&[0x00, 0x00, 0x00, 0x00, 0x50, 0x01]);
        cpu.regs.pc = 4;
        cpu.regs.set(1, 0x20).unwrap();
        call(&mut cpu, &mut sink()).unwrap();

        assert_eq!(cpu.regs.pc, 0x20);
        assert_eq!(cpu.regs.sp(), STACK_EMPTY - 1);
        assert_eq!(cpu.mem.read(0xF3).unwrap(), 6);

        ret(&mut cpu, &mut sink()).unwrap();
        assert_eq!(cpu.regs.pc, 6);
        assert_eq!(cpu.regs.sp(), STACK_EMPTY);
    }

    #[test]
    fn test_call_return_address_must_fit() {
        let mut cpu = Cpu::new();
        cpu.mem.write(254, 0x50).unwrap();
        cpu.mem.write(255, 0x00).unwrap();
        cpu.regs.pc = 254;
        let err = call(&mut cpu, &mut sink()).unwrap_err();
        assert!(matches!(err, CpuError::ReturnAddressOutOfRange(256)));
    }

    #[test]
    fn test_conditional_jumps() {
        let cases: [(Handler, bool, bool); 4] = [
            (jeq, true, true),
            (jeq, false, false),
            (jne, true, false),
            (jne, false, true),
        ];
        for (handler, equal, taken) in cases {
            let mut cpu = cpu_with(&[0x00, 0x00, 0x00, 0x55, 0x02]);
            cpu.regs.pc = 3;
            cpu.regs.set(2, 0x40).unwrap();
            cpu.regs.fl = if equal { FLAG_EQUAL } else { FLAG_LESS };

            handler(&mut cpu, &mut sink()).unwrap();
            let expected = if taken { 0x40 } else { 5 };
            assert_eq!(cpu.regs.pc, expected);
        }
    }

    #[test]
    fn test_jmp() {
        let mut cpu = cpu_with(&[0x54, 0x05]);
        cpu.regs.set(5, 0x99).unwrap();
        jmp(&mut cpu, &mut sink()).unwrap();
        assert_eq!(cpu.regs.pc, 0x99);
    }

    #[test]
    fn test_alu_op_from_opcode() {
        assert_eq!(AluOp::from_opcode(0xA0), Some(AluOp::Add));
        assert_eq!(AluOp::from_opcode(0xA2), Some(AluOp::Mul));
        assert_eq!(AluOp::from_opcode(0xA7), Some(AluOp::Cmp));
        assert_eq!(AluOp::from_opcode(0x82), None);
        assert_eq!(AluOp::from_opcode(0xFF), None);
    }
}
