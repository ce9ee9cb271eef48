// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::isa::Instruction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    Instruction,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub address: u32,
    pub kind: LabelKind,
}

/// A string literal placed in the data section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntry {
    pub label: String,
    pub address: u32,
    /// Declared text followed by a single terminating zero byte.
    pub bytes: Vec<u8>,
}

impl DataEntry {
    pub fn end(&self) -> u32 {
        self.address + self.bytes.len() as u32
    }
}

/// Linked program: instruction records indexed by instruction address plus the data table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    instructions: Vec<Instruction>,
    lines: Vec<usize>,
    data: Vec<DataEntry>,
    labels: Vec<Label>,
}

impl Executable {
    pub fn new(
        instructions: Vec<Instruction>,
        lines: Vec<usize>,
        data: Vec<DataEntry>,
        labels: Vec<Label>,
    ) -> Self {
        debug_assert_eq!(instructions.len(), lines.len());
        Self {
            instructions,
            lines,
            data,
            labels,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Source line (1-based) of the instruction at `index`.
    pub fn line_of(&self, index: usize) -> Option<usize> {
        self.lines.get(index).copied()
    }

    pub fn data(&self) -> &[DataEntry] {
        &self.data
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn label(&self, name: &str) -> Option<&Label> {
        self.labels.iter().find(|l| l.name == name)
    }
}
