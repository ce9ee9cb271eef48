// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use thumblab_core::memory::Memory;
use thumblab_core::program::Executable;
use tracing::debug;

/// Writes every data entry into `memory` byte by byte, in declaration order.
/// Loading the same executable again rewrites the same bytes.
pub fn load(executable: &Executable, memory: &mut Memory) {
    for entry in executable.data() {
        debug!(
            "Loading '{}' at {:#x} ({} bytes)",
            entry.label,
            entry.address,
            entry.bytes.len()
        );
        for (i, byte) in entry.bytes.iter().enumerate() {
            memory.write_u8(entry.address.wrapping_add(i as u32), *byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::{link, DATA_BASE};
    use crate::parser::parse;

    #[test]
    fn test_load_is_idempotent() {
        let exe = link(&parse("a: .asciz \"hi\"\nb: .asciz \"yo\"\n").unwrap()).unwrap();
        let mut memory = Memory::new();
        load(&exe, &mut memory);
        let first = memory.read_bytes(DATA_BASE, 6);
        load(&exe, &mut memory);
        assert_eq!(memory.read_bytes(DATA_BASE, 6), first);
        assert_eq!(first, b"hi\0yo\0");
    }
}
