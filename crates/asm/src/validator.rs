// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Operand range checks. Values are compared before narrowing, so a literal
//! that only fits after truncation is still rejected.

use crate::ast::{AddressNode, BitfieldKind, Instr, Num, Offset, Operand2, Program, ShiftBy};
use crate::error::RangeError;
use thumblab_core::isa::{ArithOp, Indexing, ShiftKind};

/// Inclusive bounds for one operand position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub what: &'static str,
    pub min: i128,
    pub max: i128,
}

impl Bounds {
    const fn new(what: &'static str, min: i128, max: i128) -> Self {
        Self { what, min, max }
    }

    fn check(self, num: Num, line: usize) -> Result<(), RangeError> {
        let value = num.value();
        if value < self.min || value > self.max {
            return Err(RangeError {
                line,
                message: format!(
                    "{} {} out of range {}..={}",
                    self.what, value, self.min, self.max
                ),
            });
        }
        Ok(())
    }
}

pub const IMM16: Bounds = Bounds::new("16-bit immediate", 0, 65535);
pub const IMM12: Bounds = Bounds::new("12-bit immediate", 0, 4095);
/// Upper bound 256, one past an 8-bit field, kept as taught.
pub const IMM8M: Bounds = Bounds::new("modified immediate", 0, 256);
pub const BITFIELD_LSB: Bounds = Bounds::new("bitfield lsb", 0, 31);
pub const BITFIELD_WIDTH: Bounds = Bounds::new("bitfield width", 1, 32);
pub const ADDRESS_SHIFT: Bounds = Bounds::new("address shift", 0, 3);
pub const PRE_OFFSET: Bounds = Bounds::new("offset", -255, 4095);
pub const POST_OFFSET: Bounds = Bounds::new("post-indexed offset", -255, 255);

pub fn shift_bounds(kind: ShiftKind) -> Bounds {
    match kind {
        ShiftKind::Lsl => Bounds::new("LSL amount", 0, 31),
        ShiftKind::Lsr => Bounds::new("LSR amount", 1, 32),
        ShiftKind::Asr => Bounds::new("ASR amount", 1, 32),
        ShiftKind::Ror => Bounds::new("ROR amount", 1, 31),
    }
}

/// Reports the first violation in source order.
pub fn validate(program: &Program) -> Result<(), RangeError> {
    for (line, instr) in program.instructions() {
        validate_instr(instr, line)?;
    }
    Ok(())
}

fn validate_instr(instr: &Instr, line: usize) -> Result<(), RangeError> {
    match instr {
        Instr::Arithmetic {
            op,
            operand,
            set_flags,
            ..
        } => {
            let wide = matches!(op, ArithOp::Add | ArithOp::Sub) && !set_flags;
            check_operand2(operand, if wide { IMM12 } else { IMM8M }, line)
        }
        Instr::Move {
            operand,
            negate,
            set_flags,
            ..
        } => {
            let wide = !negate && !set_flags;
            check_operand2(operand, if wide { IMM16 } else { IMM8M }, line)
        }
        Instr::Compare { operand, .. } | Instr::Logical { operand, .. } => {
            check_operand2(operand, IMM8M, line)
        }
        Instr::MoveWide { imm, .. } => IMM16.check(*imm, line),
        Instr::Shift { kind, amount, .. } => check_shift(*kind, amount, line),
        Instr::Memory { address, .. } => check_address(address, line),
        Instr::Bitfield {
            kind, lsb, width, ..
        } => check_bitfield(*kind, *lsb, *width, line),
        Instr::MultiplyDivide(_)
        | Instr::LoadLiteral { .. }
        | Instr::Rrx { .. }
        | Instr::Reverse { .. }
        | Instr::Branch { .. }
        | Instr::BranchRegister { .. }
        | Instr::CompareZero { .. }
        | Instr::Stack(_)
        | Instr::Nop => Ok(()),
    }
}

fn check_operand2(operand: &Operand2, imm: Bounds, line: usize) -> Result<(), RangeError> {
    match operand {
        Operand2::Imm(num) => imm.check(*num, line),
        Operand2::Shifted { shift, amount, .. } => check_shift(*shift, amount, line),
        Operand2::Reg(_) | Operand2::Rrx(_) => Ok(()),
    }
}

fn check_shift(kind: ShiftKind, amount: &ShiftBy, line: usize) -> Result<(), RangeError> {
    match amount {
        ShiftBy::Imm(num) => shift_bounds(kind).check(*num, line),
        ShiftBy::Reg(_) => Ok(()),
    }
}

fn check_address(address: &AddressNode, line: usize) -> Result<(), RangeError> {
    match (address.offset, address.indexing) {
        (Offset::None, _) | (Offset::Reg { shift: None, .. }, _) => Ok(()),
        (Offset::Reg { shift: Some(n), .. }, _) => ADDRESS_SHIFT.check(n, line),
        (Offset::Imm(n), Indexing::Pre { .. }) => PRE_OFFSET.check(n, line),
        (Offset::Imm(n), Indexing::Post) => POST_OFFSET.check(n, line),
    }
}

fn check_bitfield(kind: BitfieldKind, lsb: Num, width: Num, line: usize) -> Result<(), RangeError> {
    BITFIELD_LSB.check(lsb, line)?;
    BITFIELD_WIDTH.check(width, line)?;
    let end = lsb.value() + width.value();
    if end > 32 {
        let name = match kind {
            BitfieldKind::Clear => "bfc",
            BitfieldKind::Insert => "bfi",
            BitfieldKind::Extract { signed: false } => "ubfx",
            BitfieldKind::Extract { signed: true } => "sbfx",
        };
        return Err(RangeError {
            line,
            message: format!("{}: lsb + width = {} exceeds 32", name, end),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn check(source: &str) -> Result<(), RangeError> {
        validate(&parse(source).unwrap())
    }

    /// Asserts `template` with `{}` substituted accepts every value in
    /// `good` and rejects every value in `bad`.
    fn boundaries(template: &str, good: &[&str], bad: &[&str]) {
        for v in good {
            let src = template.replace("{}", v);
            assert!(check(&src).is_ok(), "expected '{}' to pass", src);
        }
        for v in bad {
            let src = template.replace("{}", v);
            assert!(check(&src).is_err(), "expected '{}' to fail", src);
        }
    }

    #[test]
    fn test_shift_amount_ranges() {
        boundaries("add r0, r1, r2, lsl #{}", &["0", "31", "0x1f"], &["-1", "32", "0x20"]);
        boundaries("add r0, r1, r2, lsr #{}", &["1", "32"], &["0", "33"]);
        boundaries("add r0, r1, r2, asr #{}", &["1", "32", "0x20"], &["0", "33", "0x21"]);
        boundaries("add r0, r1, r2, ror #{}", &["1", "31"], &["0", "32"]);
        boundaries("lsl r0, r1, {}", &["0", "31"], &["-1", "32"]);
        boundaries("lsls r0, r1, #{}", &["0"], &["-1"]);
        boundaries("asrs r0, r1, #{}", &["1", "32"], &["0", "33"]);
    }

    #[test]
    fn test_immediate_ranges() {
        boundaries("movt r0, #{}", &["0", "65535", "0xFFFF"], &["65536", "0x10000", "-1"]);
        boundaries("mov r0, #{}", &["0", "65535"], &["65536"]);
        boundaries("add r0, r1, #{}", &["0", "4095", "0xfff"], &["4096", "0x1000", "-1"]);
        boundaries("sub r0, r1, #{}", &["4095"], &["4096"]);
        boundaries("adds r0, r1, #{}", &["0", "256"], &["257", "-1"]);
        boundaries("and r0, r1, #{}", &["0", "256", "0x100"], &["257", "0x101"]);
        boundaries("cmp r0, #{}", &["256"], &["257"]);
        boundaries("mvn r0, #{}", &["256"], &["257"]);
        boundaries("movs r0, #{}", &["256"], &["257"]);
    }

    #[test]
    fn test_huge_hex_is_not_truncated_into_range() {
        // Narrowed to 32 bits this would be 1.
        assert!(check("add r0, r1, #0x100000001").is_err());
        assert!(check("movw r0, #0xFFFFFFFFFFFFFFFFFFFF").is_err());
    }

    #[test]
    fn test_bitfield_ranges() {
        boundaries("bfc r0, #{}, #1", &["0", "31"], &["32"]);
        boundaries("bfi r0, r1, #0, #{}", &["1", "32"], &["0", "33"]);
        boundaries("ubfx r0, r1, #{}, #8", &["24"], &["25"]);
        boundaries("sbfx r0, r1, #16, #{}", &["16"], &["17"]);
    }

    #[test]
    fn test_address_ranges() {
        boundaries("ldr r0, [r1, r2, lsl #{}]", &["0", "3"], &["-1", "4"]);
        boundaries("ldr r0, [r1], r2, lsl #{}", &["0", "3"], &["-1", "4"]);
        boundaries("strb r0, [r1, r2, lsl #{}]!", &["3"], &["-1", "4"]);
        boundaries("ldr r0, [r1, #{}]", &["0", "4095", "-255"], &["4096", "-256"]);
        boundaries("str r0, [r1, #{}]!", &["4095"], &["4096"]);
        boundaries("ldr r0, [r1], #{}", &["0", "255", "-255"], &["256", "-256"]);
    }

    #[test]
    fn test_first_violation_reported() {
        let err = check("nop\nadd r0, r1, #5000\nlsl r0, r1, #40").unwrap_err();
        assert_eq!(err.line, 2);
    }
}
