// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn write_temp_file(prefix: &str, ext: &str, contents: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("thumblab-tests");
    let _ = std::fs::create_dir_all(&dir);

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = dir.join(format!("{}-{}.{}", prefix, nonce, ext));
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

const HELLO: &str = r#"
        ldr r1, =msg
next:   ldrb r0, [r1], #1
        cbz r0, done
        bl uart_write
        b next
done:   mov r2, #42
msg:    .asciz "Hello\n"
"#;

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("ThumbLab Thumb-2 Simulator"));
}

#[test]
fn test_cli_version_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("thumblab"));
}

#[test]
fn test_cli_invalid_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .args(["run", "--unknown-flag-xyz"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("--unknown-flag-xyz"));
}

#[test]
fn test_run_prints_console_and_registers() {
    let source = write_temp_file("hello", "s", HELLO);
    let output = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .args(["run", source.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Hello"), "stdout: {}", stdout);
    assert!(stdout.contains("r2  = 0x0000002a (42)"), "stdout: {}", stdout);
    assert!(stdout.contains("Finished after"), "stdout: {}", stdout);
}

#[test]
fn test_run_stops_at_label_breakpoint() {
    let source = write_temp_file("bp", "s", HELLO);
    let output = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .args(["run", source.to_str().unwrap(), "--breakpoint", "done"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Stopped at breakpoint, instruction 5"),
        "stdout: {}",
        stdout
    );
    assert!(stdout.contains("r2  = 0x00000000 (0)"), "stdout: {}", stdout);
}

#[test]
fn test_run_breakpoint_on_data_label_is_config_error() {
    let source = write_temp_file("bp-data", "s", HELLO);
    let output = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .args(["run", source.to_str().unwrap(), "--breakpoint", "msg"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_run_reads_console_input() {
    let source = write_temp_file(
        "echo",
        "s",
        "loop: bl uart_read\n      cbz r0, end\n      bl uart_write\n      b loop\nend:\n",
    );
    let output = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .args(["run", source.to_str().unwrap(), "--input", "ping"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("ping"));
}

#[test]
fn test_run_assembly_error_exit_2() {
    let source = write_temp_file("bad", "s", "mov r0, #1\nfrob r1\n");
    let output = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .args(["run", source.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("line 2"), "stdout: {}", stdout);
}

#[test]
fn test_run_missing_source_exit_2() {
    let output = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .args(["run", "non_existent_file.s"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_run_runtime_error_exit_3() {
    let source = write_temp_file("underflow", "s", "pop {r0}\n");
    let output = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .args(["run", source.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_run_trap_div_zero_flag() {
    let source = write_temp_file("div", "s", "mov r1, #1\nmov r2, #0\nudiv r0, r1, r2\n");
    let plain = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .args(["run", source.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");
    assert_eq!(plain.status.code(), Some(0));

    let trapped = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .args(["run", source.to_str().unwrap(), "--trap-div-zero"])
        .output()
        .expect("Failed to execute command");
    assert_eq!(trapped.status.code(), Some(3));
}

#[test]
fn test_run_writes_snapshot() {
    let source = write_temp_file("snap", "s", "mov r3, #9\npush {r3}\n");
    let snapshot = std::env::temp_dir()
        .join("thumblab-tests")
        .join(format!("snapshot-{}.json", std::process::id()));

    let output = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .args([
            "run",
            source.to_str().unwrap(),
            "--snapshot",
            snapshot.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(0));

    let content = std::fs::read_to_string(&snapshot).expect("snapshot not written");
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["registers"][3], 9);
    assert_eq!(json["stack"][0], 9);
    assert_eq!(json["pc"], 2);
}

#[test]
fn test_check_lists_layout() {
    let source = write_temp_file("check", "s", HELLO);
    let output = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .args(["check", source.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("6 instructions"), "stdout: {}", stdout);
    assert!(stdout.contains("instruction 5"), "stdout: {}", stdout);
    assert!(stdout.contains("data 0x20000000"), "stdout: {}", stdout);
    assert!(stdout.contains("7 bytes"), "stdout: {}", stdout);
}

#[test]
fn test_check_reports_undefined_label() {
    let source = write_temp_file("undef", "s", "b nowhere\n");
    let output = Command::new(env!("CARGO_BIN_EXE_thumblab"))
        .args(["check", source.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("undefined label 'nowhere'"), "stdout: {}", stdout);
}
