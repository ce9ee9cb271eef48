// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestInputs {
    /// Assembly source, relative to the script's directory unless absolute.
    pub source: String,
    /// Bytes queued for `uart_read` before the run starts.
    #[serde(default)]
    pub uart_input: Option<String>,
}

/// Where a run should halt: an instruction index or a label name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BreakpointSpec {
    Index(u32),
    Label(String),
}

impl FromStr for BreakpointSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("breakpoint cannot be empty".to_string());
        }
        if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            return u32::from_str_radix(hex, 16)
                .map(BreakpointSpec::Index)
                .map_err(|e| format!("Invalid breakpoint index '{}': {}", s, e));
        }
        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return u32::from_str(trimmed)
                .map(BreakpointSpec::Index)
                .map_err(|e| format!("Invalid breakpoint index '{}': {}", s, e));
        }
        Ok(BreakpointSpec::Label(trimmed.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestLimits {
    pub max_steps: u64,
    #[serde(default)]
    pub breakpoint: Option<BreakpointSpec>,
    #[serde(default)]
    pub trap_divide_by_zero: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Runner failed before the source was assembled (script or file error).
    ConfigError,
    AssemblyError,
    Finished,
    Breakpoint,
    MaxSteps,
    IllegalPc,
    StackUnderflow,
    DivideByZero,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemorySize {
    Byte,
    Halfword,
    #[default]
    Word,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Flag {
    N,
    Z,
    C,
    V,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UartContainsAssertion {
    pub uart_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StopReasonAssertion {
    pub expected_stop_reason: StopReason,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RegisterValueDetails {
    pub register: String,
    pub expected_value: u32,
    #[serde(default)]
    pub mask: Option<u32>,
}

impl RegisterValueDetails {
    pub fn matches(&self, actual: u32) -> bool {
        masked_eq(actual, self.expected_value, self.mask)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RegisterValueAssertion {
    pub register_value: RegisterValueDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MemoryValueDetails {
    pub address: u32,
    pub expected_value: u32,
    #[serde(default)]
    pub size: MemorySize,
    #[serde(default)]
    pub mask: Option<u32>,
}

impl MemoryValueDetails {
    pub fn matches(&self, actual: u32) -> bool {
        masked_eq(actual, self.expected_value, self.mask)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MemoryValueAssertion {
    pub memory_value: MemoryValueDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FlagValueDetails {
    pub flag: Flag,
    pub expected_value: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FlagValueAssertion {
    pub flag_value: FlagValueDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum TestAssertion {
    UartContains(UartContainsAssertion),
    RegisterValue(RegisterValueAssertion),
    MemoryValue(MemoryValueAssertion),
    FlagValue(FlagValueAssertion),
    ExpectedStopReason(StopReasonAssertion),
}

fn masked_eq(actual: u32, expected: u32, mask: Option<u32>) -> bool {
    let mask = mask.unwrap_or(u32::MAX);
    actual & mask == expected & mask
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestScript {
    pub schema_version: String,
    pub inputs: TestInputs,
    pub limits: TestLimits,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

impl TestScript {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let script: Self = serde_yaml::from_str(yaml).context("Failed to parse Test Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '{}'",
                self.schema_version,
                SCHEMA_VERSION
            );
        }

        if self.inputs.source.trim().is_empty() {
            anyhow::bail!("Input 'source' path cannot be empty");
        }

        if self.limits.max_steps == 0 {
            anyhow::bail!("Limit 'max_steps' must be greater than zero");
        }

        if let Some(BreakpointSpec::Label(name)) = &self.limits.breakpoint {
            if name.trim().is_empty() {
                anyhow::bail!("Limit 'breakpoint' label cannot be empty");
            }
        }

        for assertion in &self.assertions {
            if let TestAssertion::RegisterValue(a) = assertion {
                if a.register_value.register.trim().is_empty() {
                    anyhow::bail!("Assertion 'register_value' needs a register name");
                }
            }
        }

        Ok(())
    }
}

/// Load and validate a test script from YAML.
pub fn load_test_script<P: AsRef<Path>>(path: P) -> Result<TestScript> {
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read test script at {:?}", path.as_ref()))?;
    let script = TestScript::from_yaml(&contents)
        .with_context(|| format!("Invalid test script {:?}", path.as_ref()))?;
    tracing::debug!(
        "Loaded test script {:?} ({} assertions)",
        path.as_ref(),
        script.assertions.len()
    );
    Ok(script)
}
