// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::isa::AccessSize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Hook for live views of memory (e.g. an inspector panel).
///
/// Called synchronously on the execution thread; implementations must not block.
pub trait MemoryObserver: std::fmt::Debug + Send + Sync {
    fn on_write(&self, _addr: u32, _size: AccessSize, _value: u32) {}
    fn on_reset(&self) {}
}

impl AccessSize {
    pub fn bytes(self) -> u32 {
        match self {
            AccessSize::Byte => 1,
            AccessSize::Halfword => 2,
            AccessSize::Word => 4,
        }
    }
}

/// Sparse little-endian byte store. Unwritten addresses read as zero.
#[derive(Debug, Default)]
pub struct Memory {
    bytes: BTreeMap<u32, u8>,
    observer: Option<Arc<dyn MemoryObserver>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_observer(&mut self, observer: Option<Arc<dyn MemoryObserver>>) {
        self.observer = observer;
    }

    pub fn read_u8(&self, addr: u32) -> u8 {
        self.bytes.get(&addr).copied().unwrap_or(0)
    }

    fn store_u8(&mut self, addr: u32, value: u8) {
        if value == 0 {
            self.bytes.remove(&addr);
        } else {
            self.bytes.insert(addr, value);
        }
    }

    /// Reads `size` bytes starting at `addr`. No alignment requirement.
    pub fn get(&self, addr: u32, size: AccessSize) -> u32 {
        (0..size.bytes()).fold(0u32, |acc, i| {
            acc | (self.read_u8(addr.wrapping_add(i)) as u32) << (8 * i)
        })
    }

    /// Writes the low `size` bytes of `value` starting at `addr`.
    pub fn set(&mut self, addr: u32, value: u32, size: AccessSize) {
        for i in 0..size.bytes() {
            self.store_u8(addr.wrapping_add(i), (value >> (8 * i)) as u8);
        }
        if let Some(observer) = &self.observer {
            observer.on_write(addr, size, value);
        }
    }

    pub fn write_u8(&mut self, addr: u32, value: u8) {
        self.set(addr, value as u32, AccessSize::Byte);
    }

    pub fn reset(&mut self) {
        self.bytes.clear();
        if let Some(observer) = &self.observer {
            observer.on_reset();
        }
    }

    /// Non-zero bytes in address order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.bytes.iter().map(|(a, v)| (*a, *v))
    }

    pub fn read_bytes(&self, addr: u32, len: usize) -> Vec<u8> {
        (0..len as u32)
            .map(|i| self.read_u8(addr.wrapping_add(i)))
            .collect()
    }
}
