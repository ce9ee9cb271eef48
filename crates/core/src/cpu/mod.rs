// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod alu;
mod control;
mod data_processing;
mod load_store;
pub mod registers;

pub use registers::{Apsr, RegisterFile, Stack};

use crate::config::SimulationConfig;
use crate::isa::{Instruction, ListReg, Operand2, ShiftAmount};
use crate::memory::Memory;
use crate::uart::Uart;
use crate::{SimResult, SimulationError};

/// Everything an instruction handler may touch besides the core registers.
pub struct ExecContext<'a> {
    pub memory: &'a mut Memory,
    pub uart: &'a mut Uart,
    pub config: &'a SimulationConfig,
}

/// Thumb-2 processor state: register file, flags, PC, LR and stack.
///
/// PC is an instruction index. Every handler that redirects control flow leaves
/// PC one before the destination, because `step` always advances it afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Thumb2 {
    pub regs: RegisterFile,
    pub apsr: Apsr,
    pub pc: i32,
    pub lr: u32,
    pub stack: Stack,
}

impl Thumb2 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn register_names(&self) -> Vec<String> {
        let mut names: Vec<String> = (0..13).map(|i| format!("r{}", i)).collect();
        names.push("lr".to_string());
        names.push("pc".to_string());
        names
    }

    pub fn read_named(&self, name: &str) -> SimResult<u32> {
        match name.trim().to_ascii_lowercase().as_str() {
            "lr" => Ok(self.lr),
            "pc" => Ok(self.pc as u32),
            other => other
                .parse()
                .map(|r| self.regs.get(r))
                .map_err(|_| SimulationError::UnknownRegister(name.to_string())),
        }
    }

    pub fn write_named(&mut self, name: &str, value: u32) -> SimResult<()> {
        match name.trim().to_ascii_lowercase().as_str() {
            "lr" => self.lr = value,
            "pc" => self.pc = value as i32,
            other => {
                let reg = other
                    .parse()
                    .map_err(|_| SimulationError::UnknownRegister(name.to_string()))?;
                self.regs.set(reg, value);
            }
        }
        Ok(())
    }

    fn read_list_reg(&self, reg: ListReg) -> u32 {
        match reg {
            ListReg::Gpr(r) => self.regs.get(r),
            ListReg::Lr => self.lr,
            // A pushed PC resumes after the push, like a saved LR.
            ListReg::Pc => self.return_index(),
        }
    }

    /// Evaluates a flexible operand, returning the value and the shifter carry out.
    fn operand2(&self, operand: Operand2) -> (u32, bool) {
        let carry_in = self.apsr.c();
        match operand {
            Operand2::Imm(imm) => (imm, carry_in),
            Operand2::Reg(rm) => (self.regs.get(rm), carry_in),
            Operand2::Shifted { rm, shift, amount } => {
                let amount = self.shift_amount(amount);
                alu::shift_c(self.regs.get(rm), shift, amount, carry_in)
            }
            Operand2::Rrx(rm) => alu::rrx_c(self.regs.get(rm), carry_in),
        }
    }

    fn shift_amount(&self, amount: ShiftAmount) -> u32 {
        match amount {
            ShiftAmount::Imm(n) => n as u32,
            // Only the bottom byte of the shift register counts.
            ShiftAmount::Reg(rs) => self.regs.get(rs) & 0xFF,
        }
    }

    /// Executes one instruction and advances PC by one.
    pub fn step(&mut self, instruction: &Instruction, ctx: &mut ExecContext<'_>) -> SimResult<()> {
        #[cfg(debug_assertions)]
        tracing::debug!("PC={}, Instr={:?}", self.pc, instruction);

        match instruction {
            Instruction::Arithmetic {
                op,
                rd,
                rn,
                operand,
                set_flags,
            } => self.exec_arithmetic(*op, *rd, *rn, *operand, *set_flags),
            Instruction::MultiplyDivide(op) => self.exec_multiply_divide(op, ctx.config)?,
            Instruction::Move(op) => self.exec_move(op),
            Instruction::Shift(op) => self.exec_shift(op),
            Instruction::Compare { op, rn, operand } => self.exec_compare(*op, *rn, *operand),
            Instruction::Logical {
                op,
                rd,
                rn,
                operand,
                set_flags,
            } => self.exec_logical(*op, *rd, *rn, *operand, *set_flags),
            Instruction::Reverse { op, rd, rm } => self.exec_reverse(*op, *rd, *rm),
            Instruction::Branch(branch) => self.exec_branch(branch, ctx.uart),
            Instruction::Memory(access) => self.exec_memory(access, ctx.memory),
            Instruction::Stack(op) => self.exec_stack(op)?,
            Instruction::Bitfield(op) => self.exec_bitfield(op),
            Instruction::Nop => {}
        }

        self.pc = self.pc.wrapping_add(1);
        Ok(())
    }
}
