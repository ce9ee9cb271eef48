// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::isa::Instruction;
use crate::{SimulationObserver, StopReason};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug)]
pub struct PerformanceMetrics {
    instruction_count: AtomicU64,
    run_count: AtomicU64,
    instructions_by_family: Mutex<BTreeMap<&'static str, u64>>,
    last_stop: Mutex<Option<StopReason>>,
    start_time: Instant,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            instruction_count: AtomicU64::new(0),
            run_count: AtomicU64::new(0),
            instructions_by_family: Mutex::new(BTreeMap::new()),
            last_stop: Mutex::new(None),
            start_time: Instant::now(),
        }
    }

    pub fn reset(&self) {
        self.instruction_count.store(0, Ordering::SeqCst);
        self.run_count.store(0, Ordering::SeqCst);
        if let Ok(mut m) = self.instructions_by_family.lock() {
            m.clear();
        }
        if let Ok(mut s) = self.last_stop.lock() {
            *s = None;
        }
    }

    pub fn get_instructions(&self) -> u64 {
        self.instruction_count.load(Ordering::SeqCst)
    }

    pub fn get_runs(&self) -> u64 {
        self.run_count.load(Ordering::SeqCst)
    }

    pub fn get_family_count(&self, family: &str) -> u64 {
        self.instructions_by_family
            .lock()
            .ok()
            .and_then(|m| m.get(family).copied())
            .unwrap_or(0)
    }

    /// Per-family counts, sorted by family name.
    pub fn family_counts(&self) -> Vec<(&'static str, u64)> {
        self.instructions_by_family
            .lock()
            .map(|m| m.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default()
    }

    pub fn last_stop(&self) -> Option<StopReason> {
        self.last_stop.lock().ok().and_then(|s| *s)
    }

    pub fn get_ips(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_instructions() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl SimulationObserver for PerformanceMetrics {
    fn on_simulation_start(&self) {
        self.run_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_simulation_stop(&self, reason: &StopReason) {
        if let Ok(mut s) = self.last_stop.lock() {
            *s = Some(*reason);
        }
    }

    fn on_step_start(&self, _pc: i32, instruction: &Instruction) {
        self.instruction_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut m) = self.instructions_by_family.lock() {
            *m.entry(instruction.family()).or_insert(0) += 1;
        }
    }
}
