// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::alu::{add_with_carry, add_with_flags, field_mask, rrx_c, sbc_with_flags, shift_c, sub_with_flags};
use super::Thumb2;
use crate::config::SimulationConfig;
use crate::isa::{
    ArithOp, Bitfield, CompareOp, LogicalOp, Move, MultiplyDivide, Operand2, Reg, ReverseOp,
    Shift,
};
use crate::{SimResult, SimulationError};

impl Thumb2 {
    pub(super) fn exec_arithmetic(
        &mut self,
        op: ArithOp,
        rd: Reg,
        rn: Reg,
        operand: Operand2,
        set_flags: bool,
    ) {
        let op1 = self.regs.get(rn);
        let (op2, _) = self.operand2(operand);
        let carry_in = self.apsr.c();
        let (res, c, v) = match op {
            ArithOp::Add => add_with_flags(op1, op2),
            ArithOp::Adc => add_with_carry(op1, op2, carry_in),
            ArithOp::Sub => sub_with_flags(op1, op2),
            ArithOp::Sbc => sbc_with_flags(op1, op2, carry_in),
            ArithOp::Rsb => sub_with_flags(op2, op1),
        };
        self.regs.set(rd, res);
        if set_flags {
            self.apsr.update_nzcv(res, c, v);
        }
    }

    pub(super) fn exec_logical(
        &mut self,
        op: LogicalOp,
        rd: Reg,
        rn: Reg,
        operand: Operand2,
        set_flags: bool,
    ) {
        let op1 = self.regs.get(rn);
        let (op2, carry) = self.operand2(operand);
        let res = match op {
            LogicalOp::And => op1 & op2,
            LogicalOp::Orr => op1 | op2,
            LogicalOp::Eor => op1 ^ op2,
            LogicalOp::Bic => op1 & !op2,
            LogicalOp::Orn => op1 | !op2,
        };
        self.regs.set(rd, res);
        if set_flags {
            self.apsr.update_nzc(res, carry);
        }
    }

    pub(super) fn exec_compare(&mut self, op: CompareOp, rn: Reg, operand: Operand2) {
        let op1 = self.regs.get(rn);
        let (op2, carry) = self.operand2(operand);
        match op {
            CompareOp::Cmp => {
                let (res, c, v) = sub_with_flags(op1, op2);
                self.apsr.update_nzcv(res, c, v);
            }
            CompareOp::Cmn => {
                let (res, c, v) = add_with_flags(op1, op2);
                self.apsr.update_nzcv(res, c, v);
            }
            CompareOp::Tst => self.apsr.update_nzc(op1 & op2, carry),
            CompareOp::Teq => self.apsr.update_nzc(op1 ^ op2, carry),
        }
    }

    pub(super) fn exec_move(&mut self, op: &Move) {
        match *op {
            Move::Op2 {
                rd,
                operand,
                negate,
                set_flags,
            } => {
                let (value, _) = self.operand2(operand);
                let res = if negate { !value } else { value };
                self.regs.set(rd, res);
                if set_flags {
                    self.apsr.update_nz(res);
                }
            }
            Move::Wide { rd, imm } => self.regs.set(rd, imm as u32),
            Move::Top { rd, imm } => {
                let old_val = self.regs.get(rd);
                self.regs.set(rd, (old_val & 0x0000_FFFF) | ((imm as u32) << 16));
            }
            Move::Literal { rd, value } => self.regs.set(rd, value),
        }
    }

    pub(super) fn exec_shift(&mut self, op: &Shift) {
        let carry_in = self.apsr.c();
        let (rd, res, carry, set_flags) = match *op {
            Shift::By {
                kind,
                rd,
                rm,
                amount,
                set_flags,
            } => {
                let amount = self.shift_amount(amount);
                let (res, carry) = shift_c(self.regs.get(rm), kind, amount, carry_in);
                (rd, res, carry, set_flags)
            }
            Shift::Rrx { rd, rm, set_flags } => {
                let (res, carry) = rrx_c(self.regs.get(rm), carry_in);
                (rd, res, carry, set_flags)
            }
        };
        self.regs.set(rd, res);
        if set_flags {
            self.apsr.update_nzc(res, carry);
        }
    }

    pub(super) fn exec_multiply_divide(
        &mut self,
        op: &MultiplyDivide,
        config: &SimulationConfig,
    ) -> SimResult<()> {
        match *op {
            MultiplyDivide::Mul {
                rd,
                rn,
                rm,
                set_flags,
            } => {
                let res = self.regs.get(rn).wrapping_mul(self.regs.get(rm));
                self.regs.set(rd, res);
                if set_flags {
                    self.apsr.update_nz(res);
                }
            }
            MultiplyDivide::MulAccumulate {
                rd,
                rn,
                rm,
                ra,
                subtract,
            } => {
                let product = self.regs.get(rn).wrapping_mul(self.regs.get(rm));
                let acc = self.regs.get(ra);
                let res = if subtract {
                    acc.wrapping_sub(product)
                } else {
                    acc.wrapping_add(product)
                };
                self.regs.set(rd, res);
            }
            MultiplyDivide::Long {
                rd_lo,
                rd_hi,
                rn,
                rm,
                signed,
                accumulate,
            } => {
                let product = if signed {
                    (self.regs.get_signed(rn) as i64).wrapping_mul(self.regs.get_signed(rm) as i64)
                        as u64
                } else {
                    (self.regs.get(rn) as u64).wrapping_mul(self.regs.get(rm) as u64)
                };
                let acc = if accumulate {
                    ((self.regs.get(rd_hi) as u64) << 32) | self.regs.get(rd_lo) as u64
                } else {
                    0
                };
                let res = product.wrapping_add(acc);
                self.regs.set(rd_lo, res as u32);
                self.regs.set(rd_hi, (res >> 32) as u32);
            }
            MultiplyDivide::Div { rd, rn, rm, signed } => {
                if self.regs.get(rm) == 0 {
                    if config.trap_divide_by_zero {
                        return Err(SimulationError::DivideByZero { pc: self.pc });
                    }
                    tracing::debug!("Division by zero at PC={}, result forced to 0", self.pc);
                    self.regs.set(rd, 0);
                    return Ok(());
                }
                let res = if signed {
                    let n = self.regs.get_signed(rn);
                    let m = self.regs.get_signed(rm);
                    // i32::MIN / -1 wraps back to i32::MIN
                    n.wrapping_div(m) as u32
                } else {
                    self.regs.get(rn) / self.regs.get(rm)
                };
                self.regs.set(rd, res);
            }
        }
        Ok(())
    }

    pub(super) fn exec_reverse(&mut self, op: ReverseOp, rd: Reg, rm: Reg) {
        let val = self.regs.get(rm);
        let res = match op {
            ReverseOp::Rev => val.swap_bytes(),
            ReverseOp::Rev16 => {
                let low = ((val & 0xFF) << 8) | ((val >> 8) & 0xFF);
                let high = ((val & 0x00FF_0000) << 8) | ((val & 0xFF00_0000) >> 8);
                high | low
            }
            ReverseOp::Revsh => {
                let low = ((val & 0xFF) << 8) | ((val >> 8) & 0xFF);
                (low as u16 as i16) as i32 as u32
            }
            ReverseOp::Rbit => val.reverse_bits(),
        };
        self.regs.set(rd, res);
    }

    /// `lsb + width <= 32` is guaranteed by the assembler.
    pub(super) fn exec_bitfield(&mut self, op: &Bitfield) {
        match *op {
            Bitfield::Clear { rd, lsb, width } => {
                let mask = field_mask(lsb, width);
                let dst = self.regs.get(rd);
                self.regs.set(rd, dst & !mask);
            }
            Bitfield::Insert { rd, rn, lsb, width } => {
                let mask = field_mask(lsb, width);
                let src = self.regs.get(rn);
                let dst = self.regs.get(rd);
                let result = (dst & !mask) | (src.wrapping_shl(lsb as u32) & mask);
                self.regs.set(rd, result);
            }
            Bitfield::Extract {
                rd,
                rn,
                lsb,
                width,
                signed,
            } => {
                let val = (self.regs.get(rn).wrapping_shr(lsb as u32)) & field_mask(0, width);
                let result = if signed && width < 32 {
                    let shift = 32 - width as u32;
                    ((val << shift) as i32 >> shift) as u32
                } else {
                    val
                };
                self.regs.set(rd, result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SimulationConfig;
    use crate::cpu::{ExecContext, Thumb2};
    use crate::isa::*;
    use crate::memory::Memory;
    use crate::uart::Uart;
    use crate::SimulationError;

    fn r(n: u8) -> Reg {
        Reg::new(n).unwrap()
    }

    fn exec(cpu: &mut Thumb2, instr: Instruction) -> crate::SimResult<()> {
        exec_with(cpu, instr, &SimulationConfig::default())
    }

    fn exec_with(
        cpu: &mut Thumb2,
        instr: Instruction,
        config: &SimulationConfig,
    ) -> crate::SimResult<()> {
        let mut memory = Memory::new();
        let mut uart = Uart::new();
        let mut ctx = ExecContext {
            memory: &mut memory,
            uart: &mut uart,
            config,
        };
        cpu.step(&instr, &mut ctx)
    }

    #[test]
    fn test_adds_sets_all_flags() {
        let mut cpu = Thumb2::new();
        cpu.regs.set(r(1), 0x7FFF_FFFF);
        exec(
            &mut cpu,
            Instruction::Arithmetic {
                op: ArithOp::Add,
                rd: r(0),
                rn: r(1),
                operand: Operand2::Imm(1),
                set_flags: true,
            },
        )
        .unwrap();
        assert_eq!(cpu.regs.get(r(0)), 0x8000_0000);
        assert!(cpu.apsr.n() && cpu.apsr.v() && !cpu.apsr.c() && !cpu.apsr.z());
        assert_eq!(cpu.pc, 1);
    }

    #[test]
    fn test_add_without_s_keeps_flags() {
        let mut cpu = Thumb2::new();
        cpu.apsr.update_nzcv(0, true, true);
        let before = cpu.apsr;
        cpu.regs.set(r(1), 0xFFFF_FFFF);
        exec(
            &mut cpu,
            Instruction::Arithmetic {
                op: ArithOp::Add,
                rd: r(0),
                rn: r(1),
                operand: Operand2::Imm(1),
                set_flags: false,
            },
        )
        .unwrap();
        assert_eq!(cpu.regs.get(r(0)), 0);
        assert_eq!(cpu.apsr, before);
    }

    #[test]
    fn test_rsb_and_sbc() {
        let mut cpu = Thumb2::new();
        cpu.regs.set(r(1), 3);
        exec(
            &mut cpu,
            Instruction::Arithmetic {
                op: ArithOp::Rsb,
                rd: r(0),
                rn: r(1),
                operand: Operand2::Imm(10),
                set_flags: false,
            },
        )
        .unwrap();
        assert_eq!(cpu.regs.get(r(0)), 7);

        // Carry clear: 10 - 3 - 1
        cpu.regs.set(r(2), 10);
        exec(
            &mut cpu,
            Instruction::Arithmetic {
                op: ArithOp::Sbc,
                rd: r(0),
                rn: r(2),
                operand: Operand2::Reg(r(1)),
                set_flags: false,
            },
        )
        .unwrap();
        assert_eq!(cpu.regs.get(r(0)), 6);
    }

    #[test]
    fn test_logical_carry_from_shifter() {
        let mut cpu = Thumb2::new();
        cpu.regs.set(r(1), 0xFFFF_FFFF);
        cpu.regs.set(r(2), 0x8000_0000);
        exec(
            &mut cpu,
            Instruction::Logical {
                op: LogicalOp::And,
                rd: r(0),
                rn: r(1),
                operand: Operand2::Shifted {
                    rm: r(2),
                    shift: ShiftKind::Lsl,
                    amount: ShiftAmount::Imm(1),
                },
                set_flags: true,
            },
        )
        .unwrap();
        assert_eq!(cpu.regs.get(r(0)), 0);
        assert!(cpu.apsr.z());
        assert!(cpu.apsr.c());
        assert!(!cpu.apsr.v());
    }

    #[test]
    fn test_compare_does_not_write() {
        let mut cpu = Thumb2::new();
        cpu.regs.set(r(0), 5);
        exec(
            &mut cpu,
            Instruction::Compare {
                op: CompareOp::Cmp,
                rn: r(0),
                operand: Operand2::Imm(5),
            },
        )
        .unwrap();
        assert_eq!(cpu.regs.get(r(0)), 5);
        assert!(cpu.apsr.z() && cpu.apsr.c());

        exec(
            &mut cpu,
            Instruction::Compare {
                op: CompareOp::Cmp,
                rn: r(0),
                operand: Operand2::Imm(6),
            },
        )
        .unwrap();
        assert!(cpu.apsr.n() && !cpu.apsr.c() && !cpu.apsr.z());
    }

    #[test]
    fn test_movs_keeps_carry_and_overflow() {
        let mut cpu = Thumb2::new();
        cpu.apsr.update_nzcv(1, true, true);
        exec(
            &mut cpu,
            Instruction::Move(Move::Op2 {
                rd: r(0),
                operand: Operand2::Imm(0),
                negate: false,
                set_flags: true,
            }),
        )
        .unwrap();
        assert!(cpu.apsr.z() && cpu.apsr.c() && cpu.apsr.v());
    }

    #[test]
    fn test_movw_movt_compose() {
        let mut cpu = Thumb2::new();
        exec(&mut cpu, Instruction::Move(Move::Wide { rd: r(4), imm: 0xBEEF })).unwrap();
        exec(&mut cpu, Instruction::Move(Move::Top { rd: r(4), imm: 0xDEAD })).unwrap();
        assert_eq!(cpu.regs.get(r(4)), 0xDEAD_BEEF);
    }

    #[test]
    fn test_shift_by_register_uses_bottom_byte() {
        let mut cpu = Thumb2::new();
        cpu.regs.set(r(1), 1);
        cpu.regs.set(r(2), 0x0000_0104); // bottom byte = 4
        exec(
            &mut cpu,
            Instruction::Shift(Shift::By {
                kind: ShiftKind::Lsl,
                rd: r(0),
                rm: r(1),
                amount: ShiftAmount::Reg(r(2)),
                set_flags: true,
            }),
        )
        .unwrap();
        assert_eq!(cpu.regs.get(r(0)), 16);
    }

    #[test]
    fn test_divide_by_zero_policy() {
        let mut cpu = Thumb2::new();
        cpu.regs.set(r(1), 10);
        let div = Instruction::MultiplyDivide(MultiplyDivide::Div {
            rd: r(0),
            rn: r(1),
            rm: r(2),
            signed: false,
        });
        cpu.regs.set(r(0), 0x1234);
        exec(&mut cpu, div.clone()).unwrap();
        assert_eq!(cpu.regs.get(r(0)), 0);

        let trap = SimulationConfig {
            trap_divide_by_zero: true,
            ..Default::default()
        };
        let err = exec_with(&mut cpu, div, &trap).unwrap_err();
        assert!(matches!(err, SimulationError::DivideByZero { pc: 1 }));
    }

    #[test]
    fn test_sdiv_min_by_minus_one() {
        let mut cpu = Thumb2::new();
        cpu.regs.set(r(1), i32::MIN as u32);
        cpu.regs.set(r(2), -1i32 as u32);
        exec(
            &mut cpu,
            Instruction::MultiplyDivide(MultiplyDivide::Div {
                rd: r(0),
                rn: r(1),
                rm: r(2),
                signed: true,
            }),
        )
        .unwrap();
        assert_eq!(cpu.regs.get(r(0)), i32::MIN as u32);
    }

    #[test]
    fn test_long_multiply() {
        let mut cpu = Thumb2::new();
        cpu.regs.set(r(2), 0xFFFF_FFFF);
        cpu.regs.set(r(3), 2);
        exec(
            &mut cpu,
            Instruction::MultiplyDivide(MultiplyDivide::Long {
                rd_lo: r(0),
                rd_hi: r(1),
                rn: r(2),
                rm: r(3),
                signed: false,
                accumulate: false,
            }),
        )
        .unwrap();
        assert_eq!(cpu.regs.get(r(0)), 0xFFFF_FFFE);
        assert_eq!(cpu.regs.get(r(1)), 1);

        exec(
            &mut cpu,
            Instruction::MultiplyDivide(MultiplyDivide::Long {
                rd_lo: r(0),
                rd_hi: r(1),
                rn: r(2),
                rm: r(3),
                signed: true,
                accumulate: false,
            }),
        )
        .unwrap();
        // -1 * 2 = -2
        assert_eq!(cpu.regs.get(r(0)), 0xFFFF_FFFE);
        assert_eq!(cpu.regs.get(r(1)), 0xFFFF_FFFF);
    }

    #[test]
    fn test_reverse_family() {
        let mut cpu = Thumb2::new();
        cpu.regs.set(r(1), 0x1122_3344);
        let flags = cpu.apsr;
        for (op, expected) in [
            (ReverseOp::Rev, 0x4433_2211),
            (ReverseOp::Rev16, 0x2211_4433),
            (ReverseOp::Revsh, 0x0000_4433),
            (ReverseOp::Rbit, 0x22CC_4488),
        ] {
            exec(&mut cpu, Instruction::Reverse { op, rd: r(0), rm: r(1) }).unwrap();
            assert_eq!(cpu.regs.get(r(0)), expected, "{:?}", op);
        }
        assert_eq!(cpu.apsr, flags);
    }

    #[test]
    fn test_bitfield_ops() {
        let mut cpu = Thumb2::new();
        cpu.regs.set(r(0), 0xFFFF_FFFF);
        exec(
            &mut cpu,
            Instruction::Bitfield(Bitfield::Clear {
                rd: r(0),
                lsb: 4,
                width: 8,
            }),
        )
        .unwrap();
        assert_eq!(cpu.regs.get(r(0)), 0xFFFF_F00F);

        cpu.regs.set(r(1), 0xAB);
        exec(
            &mut cpu,
            Instruction::Bitfield(Bitfield::Insert {
                rd: r(0),
                rn: r(1),
                lsb: 4,
                width: 8,
            }),
        )
        .unwrap();
        assert_eq!(cpu.regs.get(r(0)), 0xFFFF_FABF);

        exec(
            &mut cpu,
            Instruction::Bitfield(Bitfield::Extract {
                rd: r(2),
                rn: r(0),
                lsb: 4,
                width: 8,
                signed: true,
            }),
        )
        .unwrap();
        assert_eq!(cpu.regs.get(r(2)), 0xFFFF_FFAB);
    }
}
