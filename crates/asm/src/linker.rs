// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Two-pass linker. Pass one builds the symbol table and lays out the data
//! section; pass two resolves every reference and lowers the parse tree to
//! executable instruction records.

use std::collections::HashMap;

use crate::ast::{self, Body, Instr, LiteralRef, Program};
use crate::error::LabelError;
use thumblab_core::isa::{
    self, Bitfield, Branch, ConsoleService, Instruction, MemoryAccess, Move, Shift, ShiftAmount,
};
use thumblab_core::program::{DataEntry, Executable, Label, LabelKind};
use tracing::debug;

/// First byte of the data section.
pub const DATA_BASE: u32 = 0x2000_0000;

#[derive(Debug, Default)]
struct SymbolTable {
    labels: Vec<Label>,
    index: HashMap<String, usize>,
}

impl SymbolTable {
    fn define(&mut self, name: &str, address: u32, kind: LabelKind, line: usize) -> Result<(), LabelError> {
        if self.index.contains_key(name) {
            return Err(LabelError::Duplicate {
                name: name.to_string(),
                line,
            });
        }
        debug!("Label '{}' -> {:#x} ({:?})", name, address, kind);
        self.index.insert(name.to_string(), self.labels.len());
        self.labels.push(Label {
            name: name.to_string(),
            address,
            kind,
        });
        Ok(())
    }

    fn get(&self, name: &str) -> Option<&Label> {
        self.index.get(name).map(|&i| &self.labels[i])
    }
}

pub fn link(program: &Program) -> Result<Executable, LabelError> {
    let (symbols, data) = collect_symbols(program)?;

    let mut instructions = Vec::new();
    let mut lines = Vec::new();
    for (line, instr) in program.instructions() {
        instructions.push(lower(instr, &symbols, line)?);
        lines.push(line);
    }

    debug!(
        "Linked {} instructions, {} data entries",
        instructions.len(),
        data.len()
    );
    Ok(Executable::new(instructions, lines, data, symbols.labels))
}

fn collect_symbols(program: &Program) -> Result<(SymbolTable, Vec<DataEntry>), LabelError> {
    let mut symbols = SymbolTable::default();
    let mut data = Vec::new();
    let mut instruction_count: u32 = 0;
    let mut data_cursor = DATA_BASE;

    for statement in &program.statements {
        match (&statement.label, &statement.body) {
            (Some(name), Some(Body::Data(text))) => {
                symbols.define(name, data_cursor, LabelKind::Data, statement.line)?;
                let mut bytes = text.as_bytes().to_vec();
                bytes.push(0);
                let entry = DataEntry {
                    label: name.clone(),
                    address: data_cursor,
                    bytes,
                };
                debug!(
                    "Data '{}' at {:#x}, {} bytes",
                    entry.label,
                    entry.address,
                    entry.bytes.len()
                );
                data_cursor = entry.end();
                data.push(entry);
            }
            (Some(name), _) => {
                symbols.define(name, instruction_count, LabelKind::Instruction, statement.line)?;
            }
            // The parser rejects unlabelled data.
            (None, _) => {}
        }
        if matches!(statement.body, Some(Body::Instruction(_))) {
            instruction_count += 1;
        }
    }

    Ok((symbols, data))
}

fn branch_target(symbols: &SymbolTable, name: &str, line: usize) -> Result<u32, LabelError> {
    match symbols.get(name) {
        Some(label) if label.kind == LabelKind::Instruction => Ok(label.address),
        Some(_) => Err(LabelError::NotInstruction {
            name: name.to_string(),
            line,
        }),
        None => Err(LabelError::Undefined {
            name: name.to_string(),
            line,
        }),
    }
}

fn lower_operand2(operand: ast::Operand2) -> isa::Operand2 {
    match operand {
        ast::Operand2::Imm(num) => isa::Operand2::Imm(num.narrow()),
        ast::Operand2::Reg(rm) => isa::Operand2::Reg(rm),
        ast::Operand2::Shifted { rm, shift, amount } => isa::Operand2::Shifted {
            rm,
            shift,
            amount: lower_shift(amount),
        },
        ast::Operand2::Rrx(rm) => isa::Operand2::Rrx(rm),
    }
}

/// Immediates are range-checked to at most 32 before this point.
fn lower_shift(amount: ast::ShiftBy) -> ShiftAmount {
    match amount {
        ast::ShiftBy::Imm(num) => ShiftAmount::Imm(num.narrow() as u8),
        ast::ShiftBy::Reg(rs) => ShiftAmount::Reg(rs),
    }
}

fn lower_address(address: ast::AddressNode) -> isa::Address {
    let offset = match address.offset {
        ast::Offset::None => isa::Offset::Imm(0),
        ast::Offset::Imm(num) => isa::Offset::Imm(num.narrow() as i32),
        ast::Offset::Reg { rm, shift } => isa::Offset::Reg {
            rm,
            shift: shift.map(|n| n.narrow() as u8).unwrap_or(0),
        },
    };
    isa::Address {
        rn: address.rn,
        offset,
        indexing: address.indexing,
    }
}

fn lower(instr: &Instr, symbols: &SymbolTable, line: usize) -> Result<Instruction, LabelError> {
    let lowered = match instr {
        Instr::Arithmetic {
            op,
            rd,
            rn,
            operand,
            set_flags,
        } => Instruction::Arithmetic {
            op: *op,
            rd: *rd,
            rn: *rn,
            operand: lower_operand2(*operand),
            set_flags: *set_flags,
        },
        Instr::MultiplyDivide(op) => Instruction::MultiplyDivide(*op),
        Instr::Move {
            rd,
            operand,
            negate,
            set_flags,
        } => Instruction::Move(Move::Op2 {
            rd: *rd,
            operand: lower_operand2(*operand),
            negate: *negate,
            set_flags: *set_flags,
        }),
        Instr::MoveWide { rd, imm, top } => {
            let imm = imm.narrow() as u16;
            Instruction::Move(if *top {
                Move::Top { rd: *rd, imm }
            } else {
                Move::Wide { rd: *rd, imm }
            })
        }
        Instr::LoadLiteral { rd, value } => {
            let value = match value {
                LiteralRef::Number(num) => num.narrow(),
                LiteralRef::Label(name) => {
                    symbols
                        .get(name)
                        .ok_or_else(|| LabelError::Undefined {
                            name: name.clone(),
                            line,
                        })?
                        .address
                }
            };
            Instruction::Move(Move::Literal { rd: *rd, value })
        }
        Instr::Shift {
            kind,
            rd,
            rm,
            amount,
            set_flags,
        } => Instruction::Shift(Shift::By {
            kind: *kind,
            rd: *rd,
            rm: *rm,
            amount: lower_shift(*amount),
            set_flags: *set_flags,
        }),
        Instr::Rrx { rd, rm, set_flags } => Instruction::Shift(Shift::Rrx {
            rd: *rd,
            rm: *rm,
            set_flags: *set_flags,
        }),
        Instr::Compare { op, rn, operand } => Instruction::Compare {
            op: *op,
            rn: *rn,
            operand: lower_operand2(*operand),
        },
        Instr::Logical {
            op,
            rd,
            rn,
            operand,
            set_flags,
        } => Instruction::Logical {
            op: *op,
            rd: *rd,
            rn: *rn,
            operand: lower_operand2(*operand),
            set_flags: *set_flags,
        },
        Instr::Reverse { op, rd, rm } => Instruction::Reverse {
            op: *op,
            rd: *rd,
            rm: *rm,
        },
        Instr::Branch { cond, link, target } => {
            // A program label shadows the console service of the same name.
            let console = ConsoleService::from_label(target).filter(|_| *link);
            match (symbols.get(target), console) {
                (None, Some(service)) => Instruction::Branch(Branch::Console(service)),
                _ => Instruction::Branch(Branch::Direct {
                    cond: *cond,
                    link: *link,
                    target: branch_target(symbols, target, line)?,
                }),
            }
        }
        Instr::BranchRegister { source, link } => Instruction::Branch(Branch::Register {
            source: *source,
            link: *link,
        }),
        Instr::CompareZero {
            rn,
            nonzero,
            target,
        } => Instruction::Branch(Branch::CompareZero {
            rn: *rn,
            nonzero: *nonzero,
            target: branch_target(symbols, target, line)?,
        }),
        Instr::Memory {
            load,
            size,
            signed,
            rt,
            address,
        } => Instruction::Memory(MemoryAccess {
            load: *load,
            size: *size,
            signed: *signed,
            rt: *rt,
            address: lower_address(*address),
        }),
        Instr::Stack(op) => Instruction::Stack(op.clone()),
        Instr::Bitfield {
            kind,
            rd,
            rn,
            lsb,
            width,
        } => {
            let lsb = lsb.narrow() as u8;
            let width = width.narrow() as u8;
            let rd = *rd;
            let rn = rn.unwrap_or(rd);
            Instruction::Bitfield(match kind {
                ast::BitfieldKind::Clear => Bitfield::Clear { rd, lsb, width },
                ast::BitfieldKind::Insert => Bitfield::Insert { rd, rn, lsb, width },
                ast::BitfieldKind::Extract { signed } => Bitfield::Extract {
                    rd,
                    rn,
                    lsb,
                    width,
                    signed: *signed,
                },
            })
        }
        Instr::Nop => Instruction::Nop,
    };
    Ok(lowered)
}
