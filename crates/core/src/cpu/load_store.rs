// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::Thumb2;
use crate::isa::{AccessSize, Address, Indexing, MemoryAccess, Offset};
use crate::memory::Memory;

impl Thumb2 {
    /// Returns (access address, base register value after writeback if any).
    fn resolve_address(&self, address: &Address) -> (u32, Option<u32>) {
        let base = self.regs.get(address.rn);
        let offset = match address.offset {
            Offset::Imm(imm) => imm as u32,
            Offset::Reg { rm, shift } => self.regs.get(rm) << shift,
        };
        let offset_addr = base.wrapping_add(offset);
        match address.indexing {
            Indexing::Pre { writeback } => (offset_addr, writeback.then_some(offset_addr)),
            Indexing::Post => (base, Some(offset_addr)),
        }
    }

    pub(super) fn exec_memory(&mut self, access: &MemoryAccess, memory: &mut Memory) {
        let (addr, writeback) = self.resolve_address(&access.address);

        if access.load {
            if let Some(new_base) = writeback {
                self.regs.set(access.address.rn, new_base);
            }
            let raw = memory.get(addr, access.size);
            let value = match (access.size, access.signed) {
                (AccessSize::Byte, true) => raw as u8 as i8 as i32 as u32,
                (AccessSize::Halfword, true) => raw as u16 as i16 as i32 as u32,
                _ => raw,
            };
            self.regs.set(access.rt, value);
        } else {
            let value = self.regs.get(access.rt);
            memory.set(addr, value, access.size);
            if let Some(new_base) = writeback {
                self.regs.set(access.address.rn, new_base);
            }
        }
    }
}
