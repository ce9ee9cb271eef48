// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// Session-scoped run settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Instruction index at which `run` halts before executing.
    pub breakpoint: Option<u32>,
    /// Stop after this many executed instructions (`None` = unbounded).
    pub max_steps: Option<u64>,
    /// Raise `DivideByZero` instead of producing 0 for `sdiv`/`udiv` by zero.
    pub trap_divide_by_zero: bool,
    /// Mirror console output to the host stdout.
    pub echo_uart_stdout: bool,
}
