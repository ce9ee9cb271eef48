// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod config;
pub mod cpu;
pub mod isa;
pub mod memory;
pub mod metrics;
pub mod program;
pub mod snapshot;
pub mod uart;

use std::sync::Arc;

use config::SimulationConfig;
use cpu::{Apsr, ExecContext, Thumb2};
use isa::{AccessSize, Instruction, Reg};
use memory::Memory;
use program::Executable;
use uart::Uart;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Illegal program counter {0}")]
    IllegalPc(i32),
    #[error("Pop from empty stack at instruction {pc}")]
    StackUnderflow { pc: i32 },
    #[error("Division by zero at instruction {pc}")]
    DivideByZero { pc: i32 },
    #[error("Unknown register '{0}'")]
    UnknownRegister(String),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait for observing simulation events in a modular way.
pub trait SimulationObserver: std::fmt::Debug + Send + Sync {
    fn on_simulation_start(&self) {}
    fn on_simulation_stop(&self, _reason: &StopReason) {}
    fn on_step_start(&self, _pc: i32, _instruction: &Instruction) {}
    fn on_step_end(&self, _pc: i32) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// PC left the program.
    Finished,
    /// Halted before executing the instruction at this index.
    Breakpoint(u32),
    MaxStepsReached,
    StepDone,
}

/// Trait for controlling the machine from an inspector front end.
pub trait DebugControl {
    fn set_breakpoint(&mut self, index: Option<u32>);
    fn breakpoint(&self) -> Option<u32>;

    /// Run the loaded program from the start.
    fn run(&mut self) -> SimResult<StopReason>;

    /// Continue from the current PC, stepping over a breakpoint PC sits on.
    fn resume(&mut self) -> SimResult<StopReason>;

    /// Step a single instruction
    fn step_single(&mut self) -> SimResult<StopReason>;

    fn read_register(&self, name: &str) -> SimResult<u32>;
    fn write_register(&mut self, name: &str, value: u32) -> SimResult<()>;
    fn flags(&self) -> Apsr;

    fn read_memory(&self, addr: u32, size: AccessSize) -> u32;
    fn write_memory(&mut self, addr: u32, value: u32, size: AccessSize);
    fn stack(&self) -> &[u32];

    fn get_pc(&self) -> i32;
    fn get_register_names(&self) -> Vec<String>;
    fn get_step_count(&self) -> u64;
    fn reset(&mut self);
}

/// One processor session: CPU state, memory, console and run settings.
#[derive(Debug, Default)]
pub struct Machine {
    pub cpu: Thumb2,
    pub memory: Memory,
    pub uart: Uart,
    pub config: SimulationConfig,
    pub observers: Vec<Arc<dyn SimulationObserver>>,
    pub total_steps: u64,
    program: Option<Arc<Executable>>,
}

impl Machine {
    pub fn new(config: SimulationConfig) -> Self {
        let mut uart = Uart::new();
        uart.set_echo_stdout(config.echo_uart_stdout);
        Self {
            uart,
            config,
            ..Default::default()
        }
    }

    /// Keeps `program` for the `DebugControl` entry points.
    pub fn load_program(&mut self, program: Executable) {
        self.program = Some(Arc::new(program));
        self.cpu.pc = 0;
    }

    pub fn program(&self) -> Option<&Executable> {
        self.program.as_deref()
    }

    /// Sets PC to 0 and executes until PC leaves the program, the breakpoint
    /// is reached or the step limit is hit.
    pub fn run(&mut self, program: &Executable) -> SimResult<StopReason> {
        self.cpu.pc = 0;
        self.run_from_pc(program, false)
    }

    fn run_from_pc(&mut self, program: &Executable, skip_breakpoint: bool) -> SimResult<StopReason> {
        tracing::info!(
            "Run started at PC={} ({} instructions)",
            self.cpu.pc,
            program.len()
        );
        for observer in &self.observers {
            observer.on_simulation_start();
        }

        let result = self.run_loop(program, skip_breakpoint);

        match &result {
            Ok(reason) => {
                tracing::info!("Run stopped: {:?} after {} steps", reason, self.total_steps);
                for observer in &self.observers {
                    observer.on_simulation_stop(reason);
                }
            }
            Err(e) => tracing::info!("Run aborted: {}", e),
        }
        result
    }

    fn run_loop(&mut self, program: &Executable, mut skip_breakpoint: bool) -> SimResult<StopReason> {
        let mut steps: u64 = 0;
        loop {
            let pc = self.cpu.pc;
            if pc < 0 {
                return Err(SimulationError::IllegalPc(pc));
            }
            if pc as usize >= program.len() {
                return Ok(StopReason::Finished);
            }
            // Check breakpoint BEFORE stepping
            if !skip_breakpoint && self.config.breakpoint == Some(pc as u32) {
                return Ok(StopReason::Breakpoint(pc as u32));
            }
            skip_breakpoint = false;
            if let Some(max) = self.config.max_steps {
                if steps >= max {
                    return Ok(StopReason::MaxStepsReached);
                }
            }

            self.execute_at(program, pc as usize)?;
            steps += 1;
        }
    }

    /// Executes exactly one instruction at the current PC.
    pub fn step(&mut self, program: &Executable) -> SimResult<StopReason> {
        let pc = self.cpu.pc;
        if pc < 0 {
            return Err(SimulationError::IllegalPc(pc));
        }
        if pc as usize >= program.len() {
            return Ok(StopReason::Finished);
        }
        self.execute_at(program, pc as usize)?;
        Ok(StopReason::StepDone)
    }

    fn execute_at(&mut self, program: &Executable, index: usize) -> SimResult<()> {
        let instruction = &program.instructions()[index];
        let pc = self.cpu.pc;

        for observer in &self.observers {
            observer.on_step_start(pc, instruction);
        }

        let mut ctx = ExecContext {
            memory: &mut self.memory,
            uart: &mut self.uart,
            config: &self.config,
        };
        self.cpu.step(instruction, &mut ctx).map_err(|e| {
            if let Some(line) = program.line_of(index) {
                tracing::debug!("Instruction at line {} failed: {}", line, e);
            }
            e
        })?;
        self.total_steps += 1;

        for observer in &self.observers {
            observer.on_step_end(self.cpu.pc);
        }
        Ok(())
    }

    /// Clears CPU state, memory and console output. The breakpoint is kept.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.memory.reset();
        self.uart.clear_output();
        self.total_steps = 0;
    }

    pub fn snapshot(&self) -> snapshot::MachineSnapshot {
        snapshot::MachineSnapshot {
            registers: self.cpu.regs.values().to_vec(),
            lr: self.cpu.lr,
            pc: self.cpu.pc,
            flags: snapshot::FlagSnapshot::from(self.cpu.apsr),
            stack: self.cpu.stack.as_slice().to_vec(),
            memory: self.memory.iter().collect(),
            uart: self.uart.snapshot(),
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: &snapshot::MachineSnapshot) {
        self.cpu.regs.clear();
        for (i, value) in snapshot.registers.iter().enumerate() {
            if let Some(reg) = Reg::new(i as u8) {
                self.cpu.regs.set(reg, *value);
            }
        }
        self.cpu.lr = snapshot.lr;
        self.cpu.pc = snapshot.pc;
        self.cpu.apsr = snapshot.flags.into();
        self.cpu.stack.clear();
        for word in &snapshot.stack {
            self.cpu.stack.push(*word);
        }
        self.memory.reset();
        for (addr, byte) in &snapshot.memory {
            self.memory.write_u8(*addr, *byte);
        }
        self.uart.restore(&snapshot.uart);
    }

    fn loaded_program(&self) -> SimResult<Arc<Executable>> {
        // Without a program, PC has nowhere legal to point.
        self.program
            .clone()
            .ok_or(SimulationError::IllegalPc(self.cpu.pc))
    }
}

impl DebugControl for Machine {
    fn set_breakpoint(&mut self, index: Option<u32>) {
        self.config.breakpoint = index;
    }

    fn breakpoint(&self) -> Option<u32> {
        self.config.breakpoint
    }

    fn run(&mut self) -> SimResult<StopReason> {
        let program = self.loaded_program()?;
        Machine::run(self, &program)
    }

    fn resume(&mut self) -> SimResult<StopReason> {
        let program = self.loaded_program()?;
        self.run_from_pc(&program, true)
    }

    fn step_single(&mut self) -> SimResult<StopReason> {
        let program = self.loaded_program()?;
        self.step(&program)
    }

    fn read_register(&self, name: &str) -> SimResult<u32> {
        self.cpu.read_named(name)
    }

    fn write_register(&mut self, name: &str, value: u32) -> SimResult<()> {
        self.cpu.write_named(name, value)
    }

    fn flags(&self) -> Apsr {
        self.cpu.apsr
    }

    fn read_memory(&self, addr: u32, size: AccessSize) -> u32 {
        self.memory.get(addr, size)
    }

    fn write_memory(&mut self, addr: u32, value: u32, size: AccessSize) {
        self.memory.set(addr, value, size);
    }

    fn stack(&self) -> &[u32] {
        self.cpu.stack.as_slice()
    }

    fn get_pc(&self) -> i32 {
        self.cpu.pc
    }

    fn get_register_names(&self) -> Vec<String> {
        self.cpu.register_names()
    }

    fn get_step_count(&self) -> u64 {
        self.total_steps
    }

    fn reset(&mut self) {
        Machine::reset(self)
    }
}
