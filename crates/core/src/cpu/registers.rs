// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::isa::{Condition, Reg};
use crate::{SimResult, SimulationError};

bitflags::bitflags! {
    /// Application Program Status Register condition flags, laid out as in xPSR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Apsr: u32 {
        const N = 1 << 31;
        const Z = 1 << 30;
        const C = 1 << 29;
        const V = 1 << 28;
    }
}

impl Apsr {
    pub fn n(&self) -> bool {
        self.contains(Apsr::N)
    }

    pub fn z(&self) -> bool {
        self.contains(Apsr::Z)
    }

    pub fn c(&self) -> bool {
        self.contains(Apsr::C)
    }

    pub fn v(&self) -> bool {
        self.contains(Apsr::V)
    }

    pub fn update_nz(&mut self, result: u32) {
        self.set(Apsr::N, (result >> 31) & 1 == 1);
        self.set(Apsr::Z, result == 0);
    }

    pub fn update_nzc(&mut self, result: u32, carry: bool) {
        self.update_nz(result);
        self.set(Apsr::C, carry);
    }

    pub fn update_nzcv(&mut self, result: u32, carry: bool, overflow: bool) {
        self.update_nzc(result, carry);
        self.set(Apsr::V, overflow);
    }

    #[inline(always)]
    pub fn check(&self, cond: Condition) -> bool {
        let (n, z, c, v) = (self.n(), self.z(), self.c(), self.v());
        match cond {
            Condition::Eq => z,
            Condition::Ne => !z,
            Condition::Cs => c,
            Condition::Cc => !c,
            Condition::Mi => n,
            Condition::Pl => !n,
            Condition::Vs => v,
            Condition::Vc => !v,
            Condition::Hi => c && !z,
            Condition::Ls => !c || z,
            Condition::Ge => n == v,
            Condition::Lt => n != v,
            Condition::Gt => !z && (n == v),
            Condition::Le => z || (n != v),
            Condition::Al => true,
        }
    }
}

/// `r0`..`r12`. Values wrap modulo 2^32.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [u32; Reg::COUNT],
}

impl RegisterFile {
    pub fn get(&self, reg: Reg) -> u32 {
        self.regs[reg.index()]
    }

    pub fn set(&mut self, reg: Reg, value: u32) {
        self.regs[reg.index()] = value;
    }

    /// Signed view of a register.
    pub fn get_signed(&self, reg: Reg) -> i32 {
        self.get(reg) as i32
    }

    pub fn values(&self) -> &[u32] {
        &self.regs
    }

    pub fn clear(&mut self) {
        self.regs = [0; Reg::COUNT];
    }
}

/// Processor-owned LIFO of 32-bit words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    words: Vec<u32>,
}

impl Stack {
    pub fn push(&mut self, value: u32) {
        self.words.push(value);
    }

    pub fn pop(&mut self, pc: i32) -> SimResult<u32> {
        self.words
            .pop()
            .ok_or(SimulationError::StackUnderflow { pc })
    }

    pub fn peek(&self) -> Option<u32> {
        self.words.last().copied()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Bottom first.
    pub fn as_slice(&self) -> &[u32] {
        &self.words
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apsr_bits_match_xpsr_layout() {
        let mut apsr = Apsr::empty();
        apsr.update_nzcv(0x8000_0000, true, true);
        assert_eq!(apsr.bits(), 0xB000_0000);
        apsr.update_nz(0);
        assert!(apsr.z() && !apsr.n() && apsr.c() && apsr.v());
    }

    #[test]
    fn test_condition_codes() {
        let mut apsr = Apsr::empty();
        apsr.update_nzcv(5, true, false);
        assert!(apsr.check(Condition::Hi));
        assert!(apsr.check(Condition::Ge));
        assert!(apsr.check(Condition::Gt));
        assert!(!apsr.check(Condition::Eq));

        apsr.update_nzcv(0x8000_0000, false, false);
        assert!(apsr.check(Condition::Lt));
        assert!(apsr.check(Condition::Le));
        assert!(apsr.check(Condition::Ls));
    }

    #[test]
    fn test_stack_lifo_and_underflow() {
        let mut stack = Stack::default();
        stack.push(1);
        stack.push(2);
        assert_eq!(stack.pop(0).unwrap(), 2);
        assert_eq!(stack.pop(0).unwrap(), 1);
        assert!(matches!(
            stack.pop(7),
            Err(SimulationError::StackUnderflow { pc: 7 })
        ));
    }

    #[test]
    fn test_register_wraps_signed_view() {
        let mut regs = RegisterFile::default();
        let r3 = Reg::new(3).unwrap();
        regs.set(r3, 0xFFFF_FFFF);
        assert_eq!(regs.get_signed(r3), -1);
    }
}
