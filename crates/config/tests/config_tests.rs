// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use thumblab_config::{Flag, StopReason, TestAssertion, TestScript};

#[test]
fn test_assertion_kinds_are_told_apart() {
    let yaml = r#"
schema_version: "1.0"
inputs:
  source: "count.s"
limits:
  max_steps: 500
assertions:
  - flag_value:
      flag: c
      expected_value: false
  - register_value:
      register: lr
      expected_value: 0x1
      mask: 0xff
  - expected_stop_reason: divide_by_zero
  - uart_contains: "done"
"#;
    let script = TestScript::from_yaml(yaml).unwrap();
    let kinds: Vec<&str> = script
        .assertions
        .iter()
        .map(|a| match a {
            TestAssertion::UartContains(_) => "uart",
            TestAssertion::RegisterValue(_) => "register",
            TestAssertion::MemoryValue(_) => "memory",
            TestAssertion::FlagValue(_) => "flag",
            TestAssertion::ExpectedStopReason(_) => "stop",
        })
        .collect();
    assert_eq!(kinds, ["flag", "register", "stop", "uart"]);

    if let TestAssertion::FlagValue(a) = &script.assertions[0] {
        assert_eq!(a.flag_value.flag, Flag::C);
    }
    if let TestAssertion::ExpectedStopReason(a) = &script.assertions[2] {
        assert_eq!(a.expected_stop_reason, StopReason::DivideByZero);
    }
}

#[test]
fn test_assertion_with_unknown_key_is_rejected() {
    let yaml = r#"
schema_version: "1.0"
inputs:
  source: "a.s"
limits:
  max_steps: 5
assertions:
  - uart_regex: "H.*o"
"#;
    assert!(TestScript::from_yaml(yaml).is_err());
}

#[test]
fn test_unknown_flag_is_rejected() {
    let yaml = r#"
schema_version: "1.0"
inputs:
  source: "a.s"
limits:
  max_steps: 5
assertions:
  - flag_value:
      flag: q
      expected_value: true
"#;
    assert!(TestScript::from_yaml(yaml).is_err());
}

#[test]
fn test_script_round_trips_through_json() {
    let yaml = r#"
schema_version: "1.0"
inputs:
  source: "a.s"
limits:
  max_steps: 5
  breakpoint: done
  trap_divide_by_zero: true
assertions:
  - expected_stop_reason: breakpoint
"#;
    let script = TestScript::from_yaml(yaml).unwrap();
    let json = serde_json::to_value(&script.limits).unwrap();
    assert_eq!(json["breakpoint"], "done");
    assert_eq!(json["trap_divide_by_zero"], true);
}
