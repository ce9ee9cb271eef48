// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Linked instruction records.
//!
//! The assembler lowers every source instruction exactly once into one of these
//! records; the engine dispatches on them without ever looking at source text again.

use std::fmt;
use std::str::FromStr;

/// General purpose register `r0`..`r12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reg(u8);

impl Reg {
    pub const COUNT: usize = 13;
    /// Argument/result register of the console services.
    pub const R0: Reg = Reg(0);

    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < Self::COUNT).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl FromStr for Reg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        lower
            .strip_prefix('r')
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(Reg::new)
            .ok_or_else(|| format!("'{}' is not a general purpose register", s))
    }
}

/// Entry of a `push`/`pop` register list, or the source of `bx`/`blx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListReg {
    Gpr(Reg),
    Lr,
    Pc,
}

impl fmt::Display for ListReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListReg::Gpr(r) => write!(f, "{}", r),
            ListReg::Lr => f.write_str("lr"),
            ListReg::Pc => f.write_str("pc"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lsl" => Some(Self::Lsl),
            "lsr" => Some(Self::Lsr),
            "asr" => Some(Self::Asr),
            "ror" => Some(Self::Ror),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Lsl => "LSL",
            Self::Lsr => "LSR",
            Self::Asr => "ASR",
            Self::Ror => "ROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftAmount {
    Imm(u8),
    Reg(Reg),
}

/// Flexible second operand of data-processing instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand2 {
    Imm(u32),
    Reg(Reg),
    Shifted {
        rm: Reg,
        shift: ShiftKind,
        amount: ShiftAmount,
    },
    Rrx(Reg),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Eq,
    Ne,
    Cs,
    Cc,
    Mi,
    Pl,
    Vs,
    Vc,
    Hi,
    Ls,
    Ge,
    Lt,
    Gt,
    Le,
    Al,
}

impl Condition {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let cond = match suffix.to_ascii_lowercase().as_str() {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "cs" | "hs" => Self::Cs,
            "cc" | "lo" => Self::Cc,
            "mi" => Self::Mi,
            "pl" => Self::Pl,
            "vs" => Self::Vs,
            "vc" => Self::Vc,
            "hi" => Self::Hi,
            "ls" => Self::Ls,
            "ge" => Self::Ge,
            "lt" => Self::Lt,
            "gt" => Self::Gt,
            "le" => Self::Le,
            "al" | "" => Self::Al,
            _ => return None,
        };
        Some(cond)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Adc,
    Sub,
    Sbc,
    Rsb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Orr,
    Eor,
    Bic,
    Orn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Cmp,
    Cmn,
    Tst,
    Teq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverseOp {
    Rev,
    Rev16,
    Revsh,
    Rbit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiplyDivide {
    Mul {
        rd: Reg,
        rn: Reg,
        rm: Reg,
        set_flags: bool,
    },
    /// `mla` (`subtract == false`) and `mls`.
    MulAccumulate {
        rd: Reg,
        rn: Reg,
        rm: Reg,
        ra: Reg,
        subtract: bool,
    },
    /// `umull`, `smull`, `umlal`, `smlal`.
    Long {
        rd_lo: Reg,
        rd_hi: Reg,
        rn: Reg,
        rm: Reg,
        signed: bool,
        accumulate: bool,
    },
    Div {
        rd: Reg,
        rn: Reg,
        rm: Reg,
        signed: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// `mov`/`mvn` with a flexible operand.
    Op2 {
        rd: Reg,
        operand: Operand2,
        negate: bool,
        set_flags: bool,
    },
    /// `movw`
    Wide { rd: Reg, imm: u16 },
    /// `movt`
    Top { rd: Reg, imm: u16 },
    /// `ldr rd, =value`, value already resolved by the linker.
    Literal { rd: Reg, value: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    By {
        kind: ShiftKind,
        rd: Reg,
        rm: Reg,
        amount: ShiftAmount,
        set_flags: bool,
    },
    Rrx {
        rd: Reg,
        rm: Reg,
        set_flags: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleService {
    UartWrite,
    UartRead,
}

impl ConsoleService {
    pub fn from_label(name: &str) -> Option<Self> {
        match name {
            "uart_write" => Some(Self::UartWrite),
            "uart_read" => Some(Self::UartRead),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// `b{cond}` / `bl` to an instruction index.
    Direct {
        cond: Condition,
        link: bool,
        target: u32,
    },
    /// `bx` / `blx`
    Register { source: ListReg, link: bool },
    /// `cbz` / `cbnz`
    CompareZero {
        rn: Reg,
        nonzero: bool,
        target: u32,
    },
    /// `bl uart_write` / `bl uart_read`
    Console(ConsoleService),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSize {
    Byte,
    Halfword,
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    Imm(i32),
    Reg { rm: Reg, shift: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indexing {
    /// `[rn, off]`, `[rn, off]!` when `writeback` is set.
    Pre { writeback: bool },
    /// `[rn], off`
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub rn: Reg,
    pub offset: Offset,
    pub indexing: Indexing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAccess {
    pub load: bool,
    pub size: AccessSize,
    pub signed: bool,
    pub rt: Reg,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackOp {
    Push(Vec<ListReg>),
    Pop(Vec<ListReg>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitfield {
    Clear {
        rd: Reg,
        lsb: u8,
        width: u8,
    },
    Insert {
        rd: Reg,
        rn: Reg,
        lsb: u8,
        width: u8,
    },
    Extract {
        rd: Reg,
        rn: Reg,
        lsb: u8,
        width: u8,
        signed: bool,
    },
}

/// One linked instruction, tagged by family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Arithmetic {
        op: ArithOp,
        rd: Reg,
        rn: Reg,
        operand: Operand2,
        set_flags: bool,
    },
    MultiplyDivide(MultiplyDivide),
    Move(Move),
    Shift(Shift),
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
    Branch(Branch),
    Memory(MemoryAccess),
    Stack(StackOp),
    Bitfield(Bitfield),
    Nop,
}

impl Instruction {
    pub fn family(&self) -> &'static str {
        match self {
            Instruction::Arithmetic { .. } => "arithmetic",
            Instruction::MultiplyDivide(_) => "multiply_divide",
            Instruction::Move(_) => "move",
            Instruction::Shift(_) => "shift",
            Instruction::Compare { .. } => "compare",
            Instruction::Logical { .. } => "logical",
            Instruction::Reverse { .. } => "reverse",
            Instruction::Branch(_) => "branch",
            Instruction::Memory(_) => "memory",
            Instruction::Stack(_) => "stack",
            Instruction::Bitfield(_) => "bitfield",
            Instruction::Nop => "nop",
        }
    }
}
