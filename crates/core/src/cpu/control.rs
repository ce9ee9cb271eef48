// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::Thumb2;
use crate::isa::{Branch, ConsoleService, ListReg, Reg, StackOp};
use crate::uart::Uart;
use crate::SimResult;
use tracing::warn;

impl Thumb2 {
    /// Points PC one before `target` so the post-step increment lands on it.
    fn jump_to_index(&mut self, target: u32) {
        self.pc = (target as i32).wrapping_sub(1);
    }

    /// Index of the instruction after the current one, as stored in LR.
    pub(super) fn return_index(&self) -> u32 {
        self.pc.wrapping_add(1) as u32
    }

    pub(super) fn exec_branch(&mut self, branch: &Branch, uart: &mut Uart) {
        match *branch {
            Branch::Direct { cond, link, target } => {
                if self.apsr.check(cond) {
                    if link {
                        self.lr = self.return_index();
                    }
                    self.jump_to_index(target);
                }
            }
            Branch::Register { source, link } => {
                let target = self.read_list_reg(source);
                if link {
                    self.lr = self.return_index();
                }
                self.jump_to_index(target);
            }
            Branch::CompareZero { rn, nonzero, target } => {
                if (self.regs.get(rn) != 0) == nonzero {
                    self.jump_to_index(target);
                }
            }
            Branch::Console(service) => self.exec_console(service, uart),
        }
    }

    fn exec_console(&mut self, service: ConsoleService, uart: &mut Uart) {
        let r0 = Reg::R0;
        match service {
            ConsoleService::UartWrite => uart.write_byte((self.regs.get(r0) & 0xFF) as u8),
            ConsoleService::UartRead => {
                let value = match uart.read_byte() {
                    Some(byte) => byte as u32,
                    None => {
                        warn!("uart_read at PC={} with no pending input, r0 set to 0", self.pc);
                        0
                    }
                };
                self.regs.set(r0, value);
            }
        }
    }

    /// Push and pop both walk the list in written order.
    pub(super) fn exec_stack(&mut self, op: &StackOp) -> SimResult<()> {
        match op {
            StackOp::Push(list) => {
                for reg in list {
                    let value = self.read_list_reg(*reg);
                    self.stack.push(value);
                }
            }
            StackOp::Pop(list) => {
                for reg in list {
                    let value = self.stack.pop(self.pc)?;
                    match *reg {
                        ListReg::Gpr(r) => self.regs.set(r, value),
                        ListReg::Lr => self.lr = value,
                        ListReg::Pc => self.jump_to_index(value),
                    }
                }
            }
        }
        Ok(())
    }
}
