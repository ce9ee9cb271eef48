// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Source to `Executable`: parse, range-check, link, then load data into memory.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod linker;
pub mod loader;
pub mod parser;
pub mod validator;

pub use error::{AssembleError, LabelError, RangeError, SyntaxError};
pub use linker::DATA_BASE;

use thumblab_core::memory::Memory;
use thumblab_core::program::Executable;

#[derive(Debug, Clone, Copy, Default)]
pub struct Assembler;

impl Assembler {
    pub fn new() -> Self {
        Self
    }

    /// Assembles `source` without touching any memory.
    pub fn link(&self, source: &str) -> Result<Executable, AssembleError> {
        let program = parser::parse(source)?;
        validator::validate(&program)?;
        Ok(linker::link(&program)?)
    }

    /// Assembles `source` and writes its data section into `memory`. Nothing is
    /// written when any stage fails.
    pub fn assemble(&self, source: &str, memory: &mut Memory) -> Result<Executable, AssembleError> {
        let executable = self.link(source)?;
        loader::load(&executable, memory);
        tracing::info!(
            "Assembled {} instructions, {} data entries",
            executable.len(),
            executable.data().len()
        );
        Ok(executable)
    }
}

/// Shorthand for `Assembler::new().assemble(source, memory)`.
pub fn assemble(source: &str, memory: &mut Memory) -> Result<Executable, AssembleError> {
    Assembler::new().assemble(source, memory)
}
