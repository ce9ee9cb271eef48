// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::Parser;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use thumblab_asm::Assembler;
use thumblab_config::{load_test_script, Flag, MemorySize, StopReason, TestAssertion, TestLimits};
use thumblab_core::config::SimulationConfig;
use thumblab_core::isa::AccessSize;
use thumblab_core::metrics::PerformanceMetrics;
use thumblab_core::{DebugControl, Machine, SimulationError};

use crate::{resolve_breakpoint, EXIT_ASSERT_FAIL, EXIT_CONFIG_ERROR, EXIT_PASS, EXIT_RUNTIME_ERROR};

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
pub struct TestArgs {
    /// Path to the test script (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    /// Override the source named by the script
    #[arg(long)]
    source: Option<PathBuf>,

    /// Override max steps (takes precedence over script)
    #[arg(long)]
    max_steps: Option<u64>,

    /// Directory to write test artifacts (result.json, uart.log, snapshot.json)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TestResult {
    result_schema_version: String,
    status: String,
    steps_executed: u64,
    instructions: u64,
    stop_reason: StopReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limits: Option<TestLimits>,
    assertions: Vec<AssertionResult>,
    source_hash: Option<String>,
    config: TestConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct AssertionResult {
    assertion: TestAssertion,
    passed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct TestConfig {
    source: Option<PathBuf>,
    script: PathBuf,
}

/// Everything known about a run that ended before any instruction executed.
struct EarlyFailure<'a> {
    stop_reason: StopReason,
    message: String,
    source_path: Option<&'a Path>,
    source: Option<&'a str>,
    limits: Option<&'a TestLimits>,
}

pub fn run_test(args: TestArgs) -> ExitCode {
    let script = match load_test_script(&args.script) {
        Ok(s) => s,
        Err(e) => {
            return fail_early(
                &args,
                EarlyFailure {
                    stop_reason: StopReason::ConfigError,
                    message: format!("{:#}", e),
                    source_path: None,
                    source: None,
                    limits: None,
                },
            )
        }
    };

    let mut limits = script.limits.clone();
    if let Some(max_steps) = args.max_steps {
        limits.max_steps = max_steps;
    }

    // Guard against accidentally huge runs from CI misconfiguration.
    const MAX_ALLOWED_STEPS: u64 = 50_000_000;
    if limits.max_steps == 0 || limits.max_steps > MAX_ALLOWED_STEPS {
        let message = format!(
            "max_steps {} must be within 1..={}",
            limits.max_steps, MAX_ALLOWED_STEPS
        );
        return fail_early(
            &args,
            EarlyFailure {
                stop_reason: StopReason::ConfigError,
                message,
                source_path: None,
                source: None,
                limits: Some(&limits),
            },
        );
    }

    let source_path = args
        .source
        .clone()
        .unwrap_or_else(|| resolve_script_path(&args.script, &script.inputs.source));

    let source = match std::fs::read_to_string(&source_path) {
        Ok(s) => s,
        Err(e) => {
            return fail_early(
                &args,
                EarlyFailure {
                    stop_reason: StopReason::ConfigError,
                    message: format!("Failed to read source {:?}: {}", source_path, e),
                    source_path: Some(&source_path),
                    source: None,
                    limits: Some(&limits),
                },
            )
        }
    };

    let mut machine = Machine::new(SimulationConfig {
        breakpoint: None,
        max_steps: Some(limits.max_steps),
        trap_divide_by_zero: limits.trap_divide_by_zero,
        echo_uart_stdout: false,
    });

    let exe = match Assembler::new().assemble(&source, &mut machine.memory) {
        Ok(exe) => exe,
        Err(e) => {
            return fail_early(
                &args,
                EarlyFailure {
                    stop_reason: StopReason::AssemblyError,
                    message: format!("{}: {}", source_path.display(), e),
                    source_path: Some(&source_path),
                    source: Some(&source),
                    limits: Some(&limits),
                },
            )
        }
    };

    if let Some(spec) = &limits.breakpoint {
        match resolve_breakpoint(spec, &exe) {
            Ok(index) => machine.config.breakpoint = Some(index),
            Err(e) => {
                return fail_early(
                    &args,
                    EarlyFailure {
                        stop_reason: StopReason::ConfigError,
                        message: format!("{:#}", e),
                        source_path: Some(&source_path),
                        source: Some(&source),
                        limits: Some(&limits),
                    },
                )
            }
        }
    }

    if let Some(input) = &script.inputs.uart_input {
        machine.uart.push_input(input.as_bytes());
    }

    let metrics = Arc::new(PerformanceMetrics::new());
    machine.observers.push(metrics.clone());

    let outcome = machine.run(&exe);
    let (stop_reason, message) = match &outcome {
        Ok(reason) => (map_stop_reason(reason), None),
        Err(e) => {
            error!("Simulation error: {}", e);
            (map_simulation_error(e), Some(e.to_string()))
        }
    };
    let sim_error_happened = outcome.is_err();

    let mut assertion_results = Vec::new();
    let mut all_passed = true;
    let mut expected_stop_reason_matched = false;

    for assertion in &script.assertions {
        let passed = check_assertion(assertion, &machine, stop_reason);

        if matches!(assertion, TestAssertion::ExpectedStopReason(_)) && passed {
            expected_stop_reason_matched = true;
        }

        if !passed {
            all_passed = false;
            error!("Assertion failed: {:?}", assertion);
        }

        assertion_results.push(AssertionResult {
            assertion: assertion.clone(),
            passed,
        });
    }

    // A program that never finished fails unless the script expected that.
    let stop_requires_assertion = matches!(stop_reason, StopReason::MaxSteps);

    let (status, code) = if !all_passed || (stop_requires_assertion && !expected_stop_reason_matched)
    {
        ("fail", EXIT_ASSERT_FAIL)
    } else if sim_error_happened && !expected_stop_reason_matched {
        ("error", EXIT_RUNTIME_ERROR)
    } else {
        ("pass", EXIT_PASS)
    };
    info!("Test {}: stop reason {:?}", status, stop_reason);

    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: status.to_string(),
        steps_executed: machine.get_step_count(),
        instructions: metrics.get_instructions(),
        stop_reason,
        message,
        limits: Some(limits.clone()),
        assertions: assertion_results,
        source_hash: Some(source_hash(&source)),
        config: TestConfig {
            source: Some(source_path.clone()),
            script: args.script.clone(),
        },
    };
    write_outputs(&args, &result, Some(&machine));

    ExitCode::from(code)
}

fn check_assertion(assertion: &TestAssertion, machine: &Machine, stop_reason: StopReason) -> bool {
    match assertion {
        TestAssertion::UartContains(a) => machine.uart.output_text().contains(&a.uart_contains),
        TestAssertion::RegisterValue(a) => match machine.read_register(&a.register_value.register) {
            Ok(value) => a.register_value.matches(value),
            Err(e) => {
                error!("{}", e);
                false
            }
        },
        TestAssertion::MemoryValue(a) => {
            let size = match a.memory_value.size {
                MemorySize::Byte => AccessSize::Byte,
                MemorySize::Halfword => AccessSize::Halfword,
                MemorySize::Word => AccessSize::Word,
            };
            a.memory_value
                .matches(machine.read_memory(a.memory_value.address, size))
        }
        TestAssertion::FlagValue(a) => {
            let flags = machine.flags();
            let actual = match a.flag_value.flag {
                Flag::N => flags.n(),
                Flag::Z => flags.z(),
                Flag::C => flags.c(),
                Flag::V => flags.v(),
            };
            actual == a.flag_value.expected_value
        }
        TestAssertion::ExpectedStopReason(a) => a.expected_stop_reason == stop_reason,
    }
}

fn map_stop_reason(reason: &thumblab_core::StopReason) -> StopReason {
    match reason {
        thumblab_core::StopReason::Finished | thumblab_core::StopReason::StepDone => {
            StopReason::Finished
        }
        thumblab_core::StopReason::Breakpoint(_) => StopReason::Breakpoint,
        thumblab_core::StopReason::MaxStepsReached => StopReason::MaxSteps,
    }
}

fn map_simulation_error(e: &SimulationError) -> StopReason {
    match e {
        SimulationError::IllegalPc(_) => StopReason::IllegalPc,
        SimulationError::StackUnderflow { .. } => StopReason::StackUnderflow,
        SimulationError::DivideByZero { .. } => StopReason::DivideByZero,
        SimulationError::UnknownRegister(_) => StopReason::ConfigError,
    }
}

fn fail_early(args: &TestArgs, failure: EarlyFailure<'_>) -> ExitCode {
    error!("{}", failure.message);
    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: "error".to_string(),
        steps_executed: 0,
        instructions: 0,
        stop_reason: failure.stop_reason,
        message: Some(failure.message),
        limits: failure.limits.cloned(),
        assertions: Vec::new(),
        source_hash: failure.source.map(source_hash),
        config: TestConfig {
            source: failure.source_path.map(Path::to_path_buf),
            script: args.script.clone(),
        },
    };
    write_outputs(args, &result, None);
    ExitCode::from(EXIT_CONFIG_ERROR)
}

fn source_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn write_outputs(args: &TestArgs, result: &TestResult, machine: Option<&Machine>) {
    let Some(output_dir) = &args.output_dir else {
        return;
    };
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        error!("Failed to create output directory {:?}: {}", output_dir, e);
        return;
    }

    let result_path = output_dir.join("result.json");
    match std::fs::File::create(&result_path) {
        Ok(f) => {
            if let Err(e) = serde_json::to_writer_pretty(f, result) {
                error!("Failed to write result.json: {}", e);
            }
        }
        Err(e) => error!("Failed to create result.json: {}", e),
    }

    let Some(machine) = machine else {
        return;
    };

    let snapshot_path = output_dir.join("snapshot.json");
    if let Err(e) = crate::report::write_snapshot(&snapshot_path, machine) {
        error!("{:#}", e);
    }

    let uart_path = output_dir.join("uart.log");
    if let Err(e) = std::fs::write(&uart_path, machine.uart.output()) {
        error!("Failed to write uart.log: {}", e);
    }
}

fn resolve_script_path(script_path: &Path, value: &str) -> PathBuf {
    let p = PathBuf::from(value);
    if p.is_absolute() {
        return p;
    }
    script_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(p)
}
