// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::isa::ShiftKind;

/// ARM `AddWithCarry`: returns (result, carry, overflow).
pub fn add_with_carry(op1: u32, op2: u32, carry_in: bool) -> (u32, bool, bool) {
    let c = carry_in as u64;
    let unsigned_sum = op1 as u64 + op2 as u64 + c;
    let signed_sum = op1 as i32 as i64 + op2 as i32 as i64 + c as i64;
    let res = unsigned_sum as u32;
    let carry = res as u64 != unsigned_sum;
    let overflow = res as i32 as i64 != signed_sum;
    (res, carry, overflow)
}

pub fn add_with_flags(op1: u32, op2: u32) -> (u32, bool, bool) {
    add_with_carry(op1, op2, false)
}

/// Carry is NOT borrow, as on ARM.
pub fn sub_with_flags(op1: u32, op2: u32) -> (u32, bool, bool) {
    add_with_carry(op1, !op2, true)
}

pub fn sbc_with_flags(op1: u32, op2: u32, carry_in: bool) -> (u32, bool, bool) {
    add_with_carry(op1, !op2, carry_in)
}

/// Barrel shifter with carry out (`Shift_C`). An amount of zero passes the
/// value and the incoming carry through unchanged.
pub fn shift_c(value: u32, kind: ShiftKind, amount: u32, carry_in: bool) -> (u32, bool) {
    if amount == 0 {
        return (value, carry_in);
    }
    match kind {
        ShiftKind::Lsl => match amount {
            1..=31 => (value << amount, (value >> (32 - amount)) & 1 == 1),
            32 => (0, value & 1 == 1),
            _ => (0, false),
        },
        ShiftKind::Lsr => match amount {
            1..=31 => (value >> amount, (value >> (amount - 1)) & 1 == 1),
            32 => (0, value >> 31 == 1),
            _ => (0, false),
        },
        ShiftKind::Asr => {
            if amount >= 32 {
                let sign = value >> 31 == 1;
                (if sign { 0xFFFF_FFFF } else { 0 }, sign)
            } else {
                (
                    ((value as i32) >> amount) as u32,
                    (value >> (amount - 1)) & 1 == 1,
                )
            }
        }
        ShiftKind::Ror => {
            let res = value.rotate_right(amount % 32);
            (res, res >> 31 == 1)
        }
    }
}

pub fn rrx_c(value: u32, carry_in: bool) -> (u32, bool) {
    (((carry_in as u32) << 31) | (value >> 1), value & 1 == 1)
}

/// Mask of `width` ones starting at bit `lsb`.
pub fn field_mask(lsb: u8, width: u8) -> u32 {
    let ones = if width >= 32 {
        !0
    } else {
        (1u32 << width).wrapping_sub(1)
    };
    ones.wrapping_shl(lsb as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_flags() {
        assert_eq!(add_with_flags(1, 2), (3, false, false));
        assert_eq!(add_with_flags(0xFFFF_FFFF, 1), (0, true, false));
        assert_eq!(add_with_flags(0x7FFF_FFFF, 1), (0x8000_0000, false, true));
        assert_eq!(add_with_flags(0x8000_0000, 0x8000_0000), (0, true, true));
    }

    #[test]
    fn test_sub_flags() {
        // 5 - 3: no borrow
        assert_eq!(sub_with_flags(5, 3), (2, true, false));
        // 3 - 5: borrow
        assert_eq!(sub_with_flags(3, 5), (0xFFFF_FFFE, false, false));
        assert_eq!(sub_with_flags(0x8000_0000, 1), (0x7FFF_FFFF, true, true));
        assert_eq!(sub_with_flags(7, 7), (0, true, false));
    }

    #[test]
    fn test_adc_sbc_carry_in() {
        assert_eq!(add_with_carry(0xFFFF_FFFF, 0, true), (0, true, false));
        assert_eq!(add_with_carry(0x7FFF_FFFF, 0, true), (0x8000_0000, false, true));
        // 5 - 3 - NOT(C=0) = 1
        assert_eq!(sbc_with_flags(5, 3, false).0, 1);
        assert_eq!(sbc_with_flags(5, 3, true).0, 2);
    }

    #[test]
    fn test_shift_carry_out() {
        assert_eq!(shift_c(0x8000_0001, ShiftKind::Lsl, 1, false), (2, true));
        assert_eq!(shift_c(0x0000_0003, ShiftKind::Lsr, 1, false), (1, true));
        assert_eq!(shift_c(0x8000_0000, ShiftKind::Asr, 4, false), (0xF800_0000, false));
        assert_eq!(shift_c(1, ShiftKind::Ror, 1, false), (0x8000_0000, true));
    }

    #[test]
    fn test_full_shift_out_at_32() {
        assert_eq!(shift_c(0x8000_0000, ShiftKind::Lsr, 32, false), (0, true));
        assert_eq!(shift_c(0x8000_0000, ShiftKind::Asr, 32, false), (0xFFFF_FFFF, true));
        assert_eq!(shift_c(0x0000_0001, ShiftKind::Lsl, 32, false), (0, true));
        assert_eq!(shift_c(0xFFFF_FFFF, ShiftKind::Lsl, 40, true), (0, false));
        assert_eq!(shift_c(0x8000_0001, ShiftKind::Ror, 32, false), (0x8000_0001, true));
    }

    #[test]
    fn test_zero_shift_keeps_carry() {
        assert_eq!(shift_c(5, ShiftKind::Lsr, 0, true), (5, true));
        assert_eq!(shift_c(5, ShiftKind::Lsl, 0, false), (5, false));
    }

    #[test]
    fn test_rrx() {
        assert_eq!(rrx_c(1, true), (0x8000_0000, true));
        assert_eq!(rrx_c(2, false), (1, false));
    }

    #[test]
    fn test_field_mask() {
        assert_eq!(field_mask(4, 4), 0xF0);
        assert_eq!(field_mask(0, 32), 0xFFFF_FFFF);
        assert_eq!(field_mask(31, 1), 0x8000_0000);
    }
}
