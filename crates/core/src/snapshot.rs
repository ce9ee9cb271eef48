// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::cpu::Apsr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MachineSnapshot {
    /// `r0`..`r12`
    pub registers: Vec<u32>,
    pub lr: u32,
    pub pc: i32,
    pub flags: FlagSnapshot,
    /// Bottom of the stack first.
    pub stack: Vec<u32>,
    /// Non-zero bytes only.
    pub memory: BTreeMap<u32, u8>,
    pub uart: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlagSnapshot {
    pub n: bool,
    pub z: bool,
    pub c: bool,
    pub v: bool,
}

impl From<Apsr> for FlagSnapshot {
    fn from(apsr: Apsr) -> Self {
        Self {
            n: apsr.n(),
            z: apsr.z(),
            c: apsr.c(),
            v: apsr.v(),
        }
    }
}

impl From<FlagSnapshot> for Apsr {
    fn from(flags: FlagSnapshot) -> Self {
        let mut apsr = Apsr::empty();
        apsr.set(Apsr::N, flags.n);
        apsr.set(Apsr::Z, flags.z);
        apsr.set(Apsr::C, flags.c);
        apsr.set(Apsr::V, flags.v);
        apsr
    }
}
