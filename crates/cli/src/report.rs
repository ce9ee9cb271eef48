// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Human-readable output for `run` and `check`.

use anyhow::Context;
use std::path::Path;
use tracing::info;

use thumblab_core::metrics::PerformanceMetrics;
use thumblab_core::program::{Executable, LabelKind};
use thumblab_core::{DebugControl, Machine, StopReason};

pub fn print_console(machine: &Machine) {
    if machine.uart.output().is_empty() {
        return;
    }
    println!("--- console ---");
    print!("{}", machine.uart.output_text());
    if !machine.uart.output().ends_with(b"\n") {
        println!();
    }
    println!("---------------");
}

pub fn print_stop(reason: &StopReason, exe: &Executable, steps: u64) {
    match reason {
        StopReason::Breakpoint(index) => {
            let line = exe
                .line_of(*index as usize)
                .map(|l| format!(" (line {})", l))
                .unwrap_or_default();
            println!("Stopped at breakpoint, instruction {}{}", index, line);
        }
        StopReason::MaxStepsReached => println!("Stopped: step limit reached after {} steps", steps),
        StopReason::Finished | StopReason::StepDone => {
            println!("Finished after {} steps", steps)
        }
    }
}

pub fn print_state(machine: &Machine) {
    for name in machine.get_register_names() {
        if name == "pc" {
            println!("{:<3} = {}", name, machine.get_pc());
            continue;
        }
        if let Ok(value) = machine.read_register(&name) {
            println!("{:<3} = {:#010x} ({})", name, value, value as i32);
        }
    }

    let flags = machine.flags();
    println!(
        "N={} Z={} C={} V={}",
        flags.n() as u8,
        flags.z() as u8,
        flags.c() as u8,
        flags.v() as u8
    );

    let stack = machine.stack();
    if !stack.is_empty() {
        let words: Vec<String> = stack.iter().map(|w| format!("{:#x}", w)).collect();
        println!("stack (bottom first): [{}]", words.join(", "));
    }
}

pub fn report_metrics(machine: &Machine, metrics: &PerformanceMetrics) {
    info!("Total Instructions: {}", metrics.get_instructions());
    for (family, count) in metrics.family_counts() {
        info!("  {:<16} {}", family, count);
    }
    info!("Steps this session: {}", machine.get_step_count());
    info!("Average IPS: {:.2}", metrics.get_ips());
}

pub fn print_layout(exe: &Executable) {
    println!("{} instructions", exe.len());

    if !exe.labels().is_empty() {
        println!("labels:");
        for label in exe.labels() {
            match label.kind {
                LabelKind::Instruction => {
                    println!("  {:<20} instruction {}", label.name, label.address)
                }
                LabelKind::Data => println!("  {:<20} data {:#010x}", label.name, label.address),
            }
        }
    }

    if !exe.data().is_empty() {
        println!("data:");
        for entry in exe.data() {
            println!(
                "  {:#010x}..{:#010x} {:<20} {} bytes",
                entry.address,
                entry.end(),
                entry.label,
                entry.bytes.len()
            );
        }
    }
}

pub fn write_snapshot(path: &Path, machine: &Machine) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create snapshot {:?}", path))?;
    serde_json::to_writer_pretty(file, &machine.snapshot())
        .with_context(|| format!("Failed to write snapshot {:?}", path))?;
    Ok(())
}
