// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Parse tree. Register operands and opcodes are already typed; numbers keep
//! their unbounded source value and symbols stay unresolved until linking.

use thumblab_core::isa::{
    AccessSize, ArithOp, CompareOp, Condition, Indexing, ListReg, LogicalOp, MultiplyDivide, Reg,
    ReverseOp, ShiftKind, StackOp,
};

/// Numeric literal as written: magnitude saturated in `u64` plus sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Num {
    pub magnitude: u64,
    pub negative: bool,
}

impl Num {
    pub fn new(magnitude: u64) -> Self {
        Self {
            magnitude,
            negative: false,
        }
    }

    /// Value used for range comparison.
    pub fn value(self) -> i128 {
        if self.negative {
            -(self.magnitude as i128)
        } else {
            self.magnitude as i128
        }
    }

    /// Two's complement narrowing to machine width.
    pub fn narrow(self) -> u32 {
        let low = self.magnitude as u32;
        if self.negative {
            low.wrapping_neg()
        } else {
            low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftBy {
    Imm(Num),
    Reg(Reg),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand2 {
    Imm(Num),
    Reg(Reg),
    Shifted { rm: Reg, shift: ShiftKind, amount: ShiftBy },
    Rrx(Reg),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    None,
    Imm(Num),
    /// `rm` optionally followed by `lsl #n`.
    Reg { rm: Reg, shift: Option<Num> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressNode {
    pub rn: Reg,
    pub offset: Offset,
    pub indexing: Indexing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralRef {
    Label(String),
    Number(Num),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitfieldKind {
    Clear,
    Insert,
    Extract { signed: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    Arithmetic {
        op: ArithOp,
        rd: Reg,
        rn: Reg,
        operand: Operand2,
        set_flags: bool,
    },
    /// Register-only forms, nothing to validate or resolve.
    MultiplyDivide(MultiplyDivide),
    Move {
        rd: Reg,
        operand: Operand2,
        negate: bool,
        set_flags: bool,
    },
    MoveWide {
        rd: Reg,
        imm: Num,
        top: bool,
    },
    LoadLiteral {
        rd: Reg,
        value: LiteralRef,
    },
    Shift {
        kind: ShiftKind,
        rd: Reg,
        rm: Reg,
        amount: ShiftBy,
        set_flags: bool,
    },
    Rrx {
        rd: Reg,
        rm: Reg,
        set_flags: bool,
    },
    Compare {
        op: CompareOp,
        rn: Reg,
        operand: Operand2,
    },
    Logical {
        op: LogicalOp,
        rd: Reg,
        rn: Reg,
        operand: Operand2,
        set_flags: bool,
    },
    Reverse {
        op: ReverseOp,
        rd: Reg,
        rm: Reg,
    },
    Branch {
        cond: Condition,
        link: bool,
        target: String,
    },
    BranchRegister {
        source: ListReg,
        link: bool,
    },
    CompareZero {
        rn: Reg,
        nonzero: bool,
        target: String,
    },
    Memory {
        load: bool,
        size: AccessSize,
        signed: bool,
        rt: Reg,
        address: AddressNode,
    },
    Stack(StackOp),
    Bitfield {
        kind: BitfieldKind,
        rd: Reg,
        rn: Option<Reg>,
        lsb: Num,
        width: Num,
    },
    Nop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// `.asciz` / `.string` text, escapes resolved, no terminator yet.
    Data(String),
    Instruction(Instr),
}

/// One source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based source line.
    pub line: usize,
    pub label: Option<String>,
    pub body: Option<Body>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn instructions(&self) -> impl Iterator<Item = (usize, &Instr)> + '_ {
        self.statements.iter().filter_map(|s| match &s.body {
            Some(Body::Instruction(instr)) => Some((s.line, instr)),
            _ => None,
        })
    }
}
