// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use thiserror::Error;

/// Source that does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: syntax error: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Operand value outside the legal range of its instruction form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct RangeError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("line {line}: undefined label '{name}'")]
    Undefined { name: String, line: usize },
    #[error("line {line}: duplicate label '{name}'")]
    Duplicate { name: String, line: usize },
    #[error("line {line}: label '{name}' does not mark an instruction")]
    NotInstruction { name: String, line: usize },
}

impl LabelError {
    pub fn line(&self) -> usize {
        match self {
            LabelError::Undefined { line, .. }
            | LabelError::Duplicate { line, .. }
            | LabelError::NotInstruction { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Label(#[from] LabelError),
}

impl AssembleError {
    pub fn line(&self) -> usize {
        match self {
            AssembleError::Syntax(e) => e.line,
            AssembleError::Range(e) => e.line,
            AssembleError::Label(e) => e.line(),
        }
    }
}
