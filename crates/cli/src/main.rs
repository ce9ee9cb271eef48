// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use thumblab_asm::Assembler;
use thumblab_config::BreakpointSpec;
use thumblab_core::config::SimulationConfig;
use thumblab_core::metrics::PerformanceMetrics;
use thumblab_core::program::{Executable, LabelKind};
use thumblab_core::Machine;

mod report;
mod test_runner;

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

#[derive(Parser, Debug)]
#[command(
    name = "thumblab",
    author,
    version,
    about = "ThumbLab Thumb-2 Simulator",
    long_about = None
)]
struct Cli {
    /// Enable instruction-level execution tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble and run a source file, then print console output and final state.
    Run(RunArgs),

    /// Assemble only and list labels and the data layout.
    Check(CheckArgs),

    /// Deterministic, CI-friendly runner mode driven by a test script (YAML).
    Test(test_runner::TestArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to the assembly source
    source: PathBuf,

    /// Halt before this instruction (label name or instruction index)
    #[arg(long)]
    breakpoint: Option<BreakpointSpec>,

    /// Maximum number of instructions to execute
    #[arg(long, default_value = "1000000")]
    max_steps: u64,

    /// Text queued for `bl uart_read`
    #[arg(long)]
    input: Option<String>,

    /// Write a machine snapshot (JSON) after the run
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Raise an error on division by zero instead of producing 0
    #[arg(long)]
    trap_div_zero: bool,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Path to the assembly source
    source: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    match cli.command {
        Commands::Run(args) => run_source(args),
        Commands::Check(args) => check_source(args),
        Commands::Test(args) => test_runner::run_test(args),
    }
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read source {:?}", path))
}

/// Maps a breakpoint given by label or index to an instruction index.
fn resolve_breakpoint(spec: &BreakpointSpec, exe: &Executable) -> anyhow::Result<u32> {
    match spec {
        BreakpointSpec::Index(index) => Ok(*index),
        BreakpointSpec::Label(name) => {
            let label = exe
                .label(name)
                .with_context(|| format!("Breakpoint label '{}' is not defined", name))?;
            if label.kind != LabelKind::Instruction {
                anyhow::bail!("Breakpoint label '{}' does not mark an instruction", name);
            }
            Ok(label.address)
        }
    }
}

fn run_source(args: RunArgs) -> ExitCode {
    info!("Starting ThumbLab Simulator");

    let source = match read_source(&args.source) {
        Ok(s) => s,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut machine = Machine::new(SimulationConfig {
        breakpoint: None,
        max_steps: Some(args.max_steps),
        trap_divide_by_zero: args.trap_div_zero,
        echo_uart_stdout: false,
    });

    let exe = match Assembler::new().assemble(&source, &mut machine.memory) {
        Ok(exe) => exe,
        Err(e) => {
            error!("{}: {}", args.source.display(), e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    if let Some(spec) = &args.breakpoint {
        match resolve_breakpoint(spec, &exe) {
            Ok(index) => machine.config.breakpoint = Some(index),
            Err(e) => {
                error!("{:#}", e);
                return ExitCode::from(EXIT_CONFIG_ERROR);
            }
        }
    }

    if let Some(input) = &args.input {
        machine.uart.push_input(input.as_bytes());
    }

    let metrics = Arc::new(PerformanceMetrics::new());
    machine.observers.push(metrics.clone());

    let result = machine.run(&exe);

    report::print_console(&machine);
    let code = match &result {
        Ok(reason) => {
            report::print_stop(reason, &exe, machine.total_steps);
            ExitCode::from(EXIT_PASS)
        }
        Err(e) => {
            error!("Simulation error: {}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    };
    report::print_state(&machine);
    report::report_metrics(&machine, &metrics);

    if let Some(path) = &args.snapshot {
        if let Err(e) = report::write_snapshot(path, &machine) {
            error!("{:#}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
        info!("Snapshot written to {:?}", path);
    }

    code
}

fn check_source(args: CheckArgs) -> ExitCode {
    let source = match read_source(&args.source) {
        Ok(s) => s,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match Assembler::new().link(&source) {
        Ok(exe) => {
            report::print_layout(&exe);
            ExitCode::from(EXIT_PASS)
        }
        Err(e) => {
            error!("{}: {}", args.source.display(), e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}
