// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Grammar-driven parser producing the typed parse tree. Every shape error is
//! reported here, before any range check or label lookup.

use crate::ast::{
    AddressNode, BitfieldKind, Body, Instr, LiteralRef, Num, Offset, Operand2, Program, ShiftBy,
    Statement,
};
use crate::error::SyntaxError;
use crate::lexer::{Lexer, LocatedToken, Token};
use thumblab_core::isa::{
    AccessSize, ArithOp, CompareOp, Condition, Indexing, ListReg, LogicalOp, MultiplyDivide, Reg,
    ReverseOp, ShiftKind, StackOp,
};

type Result<T> = std::result::Result<T, SyntaxError>;

const MNEMONICS: &[&str] = &[
    "add", "adc", "sub", "sbc", "rsb", "mul", "mla", "mls", "umull", "smull", "umlal", "smlal",
    "sdiv", "udiv", "mov", "mvn", "movw", "movt", "lsl", "lsr", "asr", "ror", "rrx", "cmp", "cmn",
    "tst", "teq", "and", "orr", "eor", "bic", "orn", "rev", "rev16", "revsh", "rbit", "b", "bl",
    "bx", "blx", "cbz", "cbnz", "ldr", "ldrb", "ldrh", "ldrsb", "ldrsh", "str", "strb", "strh",
    "push", "pop", "bfc", "bfi", "ubfx", "sbfx", "nop",
];

/// Bases accepting the `s` suffix.
const FLAG_SETTING: &[&str] = &[
    "add", "adc", "sub", "sbc", "rsb", "mul", "mov", "mvn", "lsl", "lsr", "asr", "ror", "rrx",
    "and", "orr", "eor", "bic", "orn",
];

/// Splits a lower-case mnemonic into (base, set_flags, condition).
///
/// Exact names win over `b<cond>`, which wins over the `s` suffix, so `bls`
/// is a conditional branch and `bics` is a flag-setting `bic`.
pub fn split_mnemonic(name: &str) -> Option<(&'static str, bool, Condition)> {
    if let Some(base) = MNEMONICS.iter().find(|m| **m == name) {
        return Some((*base, false, Condition::Al));
    }
    if let Some(suffix) = name.strip_prefix('b') {
        if !suffix.is_empty() {
            if let Some(cond) = Condition::from_suffix(suffix) {
                return Some(("b", false, cond));
            }
        }
    }
    let stem = name.strip_suffix('s')?;
    FLAG_SETTING
        .iter()
        .find(|m| **m == stem)
        .map(|base| (*base, true, Condition::Al))
}

/// Parses a whole program, one statement per non-blank line.
pub fn parse(source: &str) -> Result<Program> {
    let mut statements = Vec::new();
    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        let tokens = Lexer::new(text, line).tokenize()?;
        if tokens.is_empty() {
            continue;
        }
        statements.push(LineParser::new(tokens, line).statement()?);
    }
    Ok(Program { statements })
}

struct LineParser {
    tokens: Vec<LocatedToken>,
    pos: usize,
    line: usize,
}

impl LineParser {
    fn new(tokens: Vec<LocatedToken>, line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> SyntaxError {
        match self.tokens.get(self.pos) {
            Some(t) => SyntaxError::new(self.line, format!("column {}: {}", t.column, message)),
            None => SyntaxError::new(self.line, format!("end of line: {}", message)),
        }
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn comma(&mut self) -> Result<()> {
        self.expect(Token::Comma, "','")
    }

    fn finish(&self) -> Result<()> {
        if self.pos < self.tokens.len() {
            return Err(self.error("unexpected trailing operand"));
        }
        Ok(())
    }

    fn ident(&mut self, what: &str) -> Result<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error(format!("expected {}", what))),
        }
    }

    fn ident_at(&self, offset: usize) -> Option<String> {
        match self.peek_at(offset) {
            Some(Token::Ident(name)) => Some(name.to_ascii_lowercase()),
            _ => None,
        }
    }

    fn is_reg_at(&self, offset: usize) -> bool {
        self.ident_at(offset)
            .map(|name| name.parse::<Reg>().is_ok())
            .unwrap_or(false)
    }

    fn is_shift_at(&self, offset: usize) -> bool {
        matches!(
            self.ident_at(offset).as_deref(),
            Some("lsl" | "lsr" | "asr" | "ror" | "rrx")
        )
    }

    fn at_num(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Hash | Token::Minus | Token::Number(_))
        )
    }

    fn reg(&mut self) -> Result<Reg> {
        match self.peek() {
            Some(Token::Ident(name)) => match name.parse::<Reg>() {
                Ok(reg) => {
                    self.pos += 1;
                    Ok(reg)
                }
                Err(msg) => Err(self.error(msg)),
            },
            _ => Err(self.error("expected register")),
        }
    }

    fn list_reg(&mut self) -> Result<ListReg> {
        match self.ident_at(0).as_deref() {
            Some("lr") => {
                self.pos += 1;
                Ok(ListReg::Lr)
            }
            Some("pc") => {
                self.pos += 1;
                Ok(ListReg::Pc)
            }
            _ => Ok(ListReg::Gpr(self.reg()?)),
        }
    }

    /// `#` and a leading `-` are both optional.
    fn num(&mut self) -> Result<Num> {
        self.eat(&Token::Hash);
        let negative = self.eat(&Token::Minus);
        match self.peek() {
            Some(Token::Number(n)) => {
                let magnitude = *n;
                self.pos += 1;
                Ok(Num {
                    magnitude,
                    negative,
                })
            }
            _ => Err(self.error("expected number")),
        }
    }

    fn label(&mut self) -> Result<String> {
        let name = self.ident("label")?;
        if name.starts_with('.') || name.parse::<Reg>().is_ok() {
            self.pos -= 1;
            return Err(self.error(format!("'{}' is not a valid label", name)));
        }
        Ok(name)
    }

    fn statement(mut self) -> Result<Statement> {
        let label = match (self.peek_at(0), self.peek_at(1)) {
            (Some(Token::Ident(name)), Some(Token::Colon)) => Some(name.clone()),
            _ => None,
        };
        if let Some(name) = &label {
            if name.starts_with('.') {
                return Err(self.error(format!("'{}' is not a valid label", name)));
            }
            self.pos += 2;
        }

        let body = match self.ident_at(0) {
            None if self.peek().is_none() => None,
            None => return Err(self.error("expected mnemonic or directive")),
            Some(name) if name.starts_with('.') => Some(self.directive()?),
            Some(_) => Some(Body::Instruction(self.instruction()?)),
        };

        if matches!(body, Some(Body::Data(_))) && label.is_none() {
            return Err(SyntaxError::new(self.line, "data directive without a label"));
        }
        self.finish()?;

        Ok(Statement {
            line: self.line,
            label,
            body,
        })
    }

    fn directive(&mut self) -> Result<Body> {
        let name = self.ident("directive")?.to_ascii_lowercase();
        match name.as_str() {
            ".asciz" | ".string" => match self.advance() {
                Some(Token::Str(text)) => Ok(Body::Data(text)),
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    Err(self.error(format!("{} expects a string literal", name)))
                }
            },
            other => {
                self.pos -= 1;
                Err(self.error(format!("unknown directive '{}'", other)))
            }
        }
    }

    fn instruction(&mut self) -> Result<Instr> {
        let name = self.ident("mnemonic")?.to_ascii_lowercase();
        let (base, set_flags, cond) = match split_mnemonic(&name) {
            Some(parts) => parts,
            None => {
                self.pos -= 1;
                return Err(self.error(format!("unknown mnemonic '{}'", name)));
            }
        };

        let instr = match base {
            "add" | "adc" | "sub" | "sbc" | "rsb" => {
                let op = match base {
                    "add" => ArithOp::Add,
                    "adc" => ArithOp::Adc,
                    "sub" => ArithOp::Sub,
                    "sbc" => ArithOp::Sbc,
                    _ => ArithOp::Rsb,
                };
                let (rd, rn, operand) = self.data_processing_operands()?;
                Instr::Arithmetic {
                    op,
                    rd,
                    rn,
                    operand,
                    set_flags,
                }
            }
            "and" | "orr" | "eor" | "bic" | "orn" => {
                let op = match base {
                    "and" => LogicalOp::And,
                    "orr" => LogicalOp::Orr,
                    "eor" => LogicalOp::Eor,
                    "bic" => LogicalOp::Bic,
                    _ => LogicalOp::Orn,
                };
                let (rd, rn, operand) = self.data_processing_operands()?;
                Instr::Logical {
                    op,
                    rd,
                    rn,
                    operand,
                    set_flags,
                }
            }
            "cmp" | "cmn" | "tst" | "teq" => {
                let op = match base {
                    "cmp" => CompareOp::Cmp,
                    "cmn" => CompareOp::Cmn,
                    "tst" => CompareOp::Tst,
                    _ => CompareOp::Teq,
                };
                let rn = self.reg()?;
                self.comma()?;
                Instr::Compare {
                    op,
                    rn,
                    operand: self.operand2()?,
                }
            }
            "mov" | "mvn" => {
                let rd = self.reg()?;
                self.comma()?;
                Instr::Move {
                    rd,
                    operand: self.operand2()?,
                    negate: base == "mvn",
                    set_flags,
                }
            }
            "movw" | "movt" => {
                let rd = self.reg()?;
                self.comma()?;
                Instr::MoveWide {
                    rd,
                    imm: self.num()?,
                    top: base == "movt",
                }
            }
            "lsl" | "lsr" | "asr" | "ror" => {
                let kind = ShiftKind::from_name(base).ok_or_else(|| self.error("bad shift"))?;
                let rd = self.reg()?;
                self.comma()?;
                let (rm, amount) = if self.is_reg_at(0) && self.peek_at(1) == Some(&Token::Comma)
                {
                    let rm = self.reg()?;
                    self.comma()?;
                    (rm, self.shift_by()?)
                } else {
                    (rd, self.shift_by()?)
                };
                Instr::Shift {
                    kind,
                    rd,
                    rm,
                    amount,
                    set_flags,
                }
            }
            "rrx" => {
                let (rd, rm) = self.two_regs()?;
                Instr::Rrx { rd, rm, set_flags }
            }
            "mul" => {
                let rd = self.reg()?;
                self.comma()?;
                let rn = self.reg()?;
                let (rn, rm) = if self.eat(&Token::Comma) {
                    (rn, self.reg()?)
                } else {
                    (rd, rn)
                };
                Instr::MultiplyDivide(MultiplyDivide::Mul {
                    rd,
                    rn,
                    rm,
                    set_flags,
                })
            }
            "mla" | "mls" => {
                let [rd, rn, rm, ra] = self.four_regs()?;
                Instr::MultiplyDivide(MultiplyDivide::MulAccumulate {
                    rd,
                    rn,
                    rm,
                    ra,
                    subtract: base == "mls",
                })
            }
            "umull" | "smull" | "umlal" | "smlal" => {
                let [rd_lo, rd_hi, rn, rm] = self.four_regs()?;
                Instr::MultiplyDivide(MultiplyDivide::Long {
                    rd_lo,
                    rd_hi,
                    rn,
                    rm,
                    signed: base.starts_with('s'),
                    accumulate: base.ends_with("lal"),
                })
            }
            "sdiv" | "udiv" => {
                let rd = self.reg()?;
                self.comma()?;
                let rn = self.reg()?;
                let (rn, rm) = if self.eat(&Token::Comma) {
                    (rn, self.reg()?)
                } else {
                    (rd, rn)
                };
                Instr::MultiplyDivide(MultiplyDivide::Div {
                    rd,
                    rn,
                    rm,
                    signed: base == "sdiv",
                })
            }
            "rev" | "rev16" | "revsh" | "rbit" => {
                let op = match base {
                    "rev" => ReverseOp::Rev,
                    "rev16" => ReverseOp::Rev16,
                    "revsh" => ReverseOp::Revsh,
                    _ => ReverseOp::Rbit,
                };
                let (rd, rm) = self.two_regs()?;
                Instr::Reverse { op, rd, rm }
            }
            "b" | "bl" => Instr::Branch {
                cond,
                link: base == "bl",
                target: self.label()?,
            },
            "bx" | "blx" => Instr::BranchRegister {
                source: self.list_reg()?,
                link: base == "blx",
            },
            "cbz" | "cbnz" => {
                let rn = self.reg()?;
                self.comma()?;
                Instr::CompareZero {
                    rn,
                    nonzero: base == "cbnz",
                    target: self.label()?,
                }
            }
            "ldr" | "ldrb" | "ldrh" | "ldrsb" | "ldrsh" | "str" | "strb" | "strh" => {
                let load = base.starts_with("ldr");
                let signed = base.starts_with("ldrs");
                let size = if base.ends_with('b') {
                    AccessSize::Byte
                } else if base.ends_with('h') {
                    AccessSize::Halfword
                } else {
                    AccessSize::Word
                };
                let rt = self.reg()?;
                self.comma()?;
                if base == "ldr" && self.peek() == Some(&Token::Equals) {
                    Instr::LoadLiteral {
                        rd: rt,
                        value: self.literal()?,
                    }
                } else {
                    Instr::Memory {
                        load,
                        size,
                        signed,
                        rt,
                        address: self.address()?,
                    }
                }
            }
            "push" => Instr::Stack(StackOp::Push(self.register_list()?)),
            "pop" => Instr::Stack(StackOp::Pop(self.register_list()?)),
            "bfc" => {
                let rd = self.reg()?;
                self.comma()?;
                let lsb = self.num()?;
                self.comma()?;
                Instr::Bitfield {
                    kind: BitfieldKind::Clear,
                    rd,
                    rn: None,
                    lsb,
                    width: self.num()?,
                }
            }
            "bfi" | "ubfx" | "sbfx" => {
                let kind = match base {
                    "bfi" => BitfieldKind::Insert,
                    "ubfx" => BitfieldKind::Extract { signed: false },
                    _ => BitfieldKind::Extract { signed: true },
                };
                let (rd, rn) = self.two_regs()?;
                self.comma()?;
                let lsb = self.num()?;
                self.comma()?;
                Instr::Bitfield {
                    kind,
                    rd,
                    rn: Some(rn),
                    lsb,
                    width: self.num()?,
                }
            }
            "nop" => Instr::Nop,
            other => return Err(self.error(format!("unsupported mnemonic '{}'", other))),
        };

        Ok(instr)
    }

    fn two_regs(&mut self) -> Result<(Reg, Reg)> {
        let rd = self.reg()?;
        self.comma()?;
        Ok((rd, self.reg()?))
    }

    fn four_regs(&mut self) -> Result<[Reg; 4]> {
        let a = self.reg()?;
        self.comma()?;
        let b = self.reg()?;
        self.comma()?;
        let c = self.reg()?;
        self.comma()?;
        Ok([a, b, c, self.reg()?])
    }

    /// `rd, rn, op2` or the two-operand `rd, op2` where `rn` is `rd`.
    fn data_processing_operands(&mut self) -> Result<(Reg, Reg, Operand2)> {
        let rd = self.reg()?;
        self.comma()?;
        if self.is_reg_at(0) && self.peek_at(1) == Some(&Token::Comma) && !self.is_shift_at(2) {
            let rn = self.reg()?;
            self.comma()?;
            Ok((rd, rn, self.operand2()?))
        } else {
            Ok((rd, rd, self.operand2()?))
        }
    }

    fn operand2(&mut self) -> Result<Operand2> {
        if self.at_num() {
            return Ok(Operand2::Imm(self.num()?));
        }
        let rm = self.reg()?;
        if !self.eat(&Token::Comma) {
            return Ok(Operand2::Reg(rm));
        }
        if !self.is_shift_at(0) {
            return Err(self.error("expected lsl, lsr, asr, ror or rrx"));
        }
        let name = self.ident("shift")?.to_ascii_lowercase();
        match ShiftKind::from_name(&name) {
            Some(shift) => Ok(Operand2::Shifted {
                rm,
                shift,
                amount: self.shift_by()?,
            }),
            None => Ok(Operand2::Rrx(rm)),
        }
    }

    fn shift_by(&mut self) -> Result<ShiftBy> {
        if self.at_num() {
            Ok(ShiftBy::Imm(self.num()?))
        } else {
            Ok(ShiftBy::Reg(self.reg()?))
        }
    }

    fn literal(&mut self) -> Result<LiteralRef> {
        self.expect(Token::Equals, "'='")?;
        if self.at_num() {
            Ok(LiteralRef::Number(self.num()?))
        } else {
            Ok(LiteralRef::Label(self.label()?))
        }
    }

    fn address(&mut self) -> Result<AddressNode> {
        self.expect(Token::LBracket, "'['")?;
        let rn = self.reg()?;
        let offset = if self.eat(&Token::Comma) {
            self.offset()?
        } else {
            Offset::None
        };
        self.expect(Token::RBracket, "']'")?;

        if self.peek() == Some(&Token::Bang) {
            if offset == Offset::None {
                return Err(self.error("writeback requires an offset"));
            }
            self.pos += 1;
            return Ok(AddressNode {
                rn,
                offset,
                indexing: Indexing::Pre { writeback: true },
            });
        }

        if self.eat(&Token::Comma) {
            if offset != Offset::None {
                return Err(self.error("offset given both inside and after the brackets"));
            }
            return Ok(AddressNode {
                rn,
                offset: self.offset()?,
                indexing: Indexing::Post,
            });
        }

        Ok(AddressNode {
            rn,
            offset,
            indexing: Indexing::Pre { writeback: false },
        })
    }

    fn offset(&mut self) -> Result<Offset> {
        if self.at_num() {
            return Ok(Offset::Imm(self.num()?));
        }
        let rm = self.reg()?;
        if !self.eat(&Token::Comma) {
            return Ok(Offset::Reg { rm, shift: None });
        }
        if self.ident_at(0).as_deref() != Some("lsl") {
            return Err(self.error("only lsl may shift a register offset"));
        }
        self.pos += 1;
        Ok(Offset::Reg {
            rm,
            shift: Some(self.num()?),
        })
    }

    /// `{r0, r4-r6, lr}`; ranges expand ascending in place.
    fn register_list(&mut self) -> Result<Vec<ListReg>> {
        self.expect(Token::LBrace, "'{'")?;
        let mut list = Vec::new();
        loop {
            let first = self.list_reg()?;
            if self.eat(&Token::Minus) {
                let last = self.list_reg()?;
                match (first, last) {
                    (ListReg::Gpr(a), ListReg::Gpr(b)) if a <= b => list.extend(
                        (a.index()..=b.index())
                            .filter_map(|i| Reg::new(i as u8))
                            .map(ListReg::Gpr),
                    ),
                    _ => return Err(self.error(format!("invalid register range {}-{}", first, last))),
                }
            } else {
                list.push(first);
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace, "'}'")?;
        Ok(list)
    }
}
