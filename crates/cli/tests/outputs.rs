use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn write_temp_file(prefix: &str, contents: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("axiprobe-tests");
    let _ = std::fs::create_dir_all(&dir);

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = dir.join(format!("{}-{}.yaml", prefix, nonce));
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

#[test]
fn test_check_mode_outputs() {
    let mut dir = std::env::temp_dir();
    dir.push("axiprobe-tests-outputs");
    let _ = std::fs::create_dir_all(&dir);

    // Board referenced by a relative path to test resolution against the
    // plan file's directory.
    let board_path = dir.join("board.yaml");
    std::fs::write(
        &board_path,
        r#"
name: "zynq-bringup"
arch: "cortex-m3"
peripherals:
  - id: "loopback"
    type: "loopback"
    base_address: 0x40000000
    size: "16B"
"#,
    )
    .expect("Failed to write board");

    let plan_path = dir.join("plan.yaml");
    std::fs::write(
        &plan_path,
        r#"
schema_version: "1.0"
board: "board.yaml"
iterations: 1000
"#,
    )
    .expect("Failed to write plan");

    let output_dir = dir.join("artifacts");

    let output = Command::new(env!("CARGO_BIN_EXE_axiprobe"))
        .args([
            "check",
            "--plan",
            plan_path.to_str().unwrap(),
            "--output-dir",
            output_dir.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());

    let result_path = output_dir.join("result.json");
    assert!(result_path.exists());

    let result_content = std::fs::read_to_string(&result_path).unwrap();
    let result: serde_json::Value = serde_json::from_str(&result_content).unwrap();

    assert_eq!(result["status"], "pass");
    assert_eq!(result["iterations"], 1000);
    assert_eq!(result["mismatches"], 0);
    assert_eq!(result["stop_reason"], "iteration_limit");
    assert_eq!(result["plan"]["iterations"], 1000);

    // Clean up
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_check_mode_fault_injection_fails_strict_expectation() {
    let plan = write_temp_file(
        "plan-fault-strict",
        r#"
schema_version: "1.0"
iterations: 100
read_fault:
  xor_mask: 1
"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_axiprobe"))
        .args(["check", "--plan", plan.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    // Default expectation is exactly 0 mismatches.
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1)); // EXIT_MISMATCH
}

#[test]
fn test_check_mode_fault_injection_passes_expected_count() {
    let plan = write_temp_file(
        "plan-fault-counted",
        r#"
schema_version: "1.0"
iterations: 100
read_fault:
  xor_mask: 1
expected_mismatches:
  exactly: 100
"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_axiprobe"))
        .args(["check", "--plan", plan.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
}

#[test]
fn test_check_mode_stuck_register() {
    let plan = write_temp_file(
        "plan-stuck",
        r#"
schema_version: "1.0"
iterations: 10
read_fault:
  stuck: 6
expected_mismatches:
  exactly: 9
"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_axiprobe"))
        .args(["check", "--plan", plan.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
}

#[test]
fn test_check_mode_iteration_guard() {
    let plan = write_temp_file(
        "plan-huge",
        r#"
schema_version: "1.0"
iterations: 60000000
"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_axiprobe"))
        .args(["check", "--plan", plan.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    // Rejected by the MAX_ALLOWED_ITERATIONS guard.
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2)); // EXIT_CONFIG_ERROR
}

#[test]
fn test_run_mode_clean() {
    let output = Command::new(env!("CARGO_BIN_EXE_axiprobe"))
        .args(["run", "--iterations", "50"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
}

#[test]
fn test_run_mode_with_fault() {
    let output = Command::new(env!("CARGO_BIN_EXE_axiprobe"))
        .args(["run", "--iterations", "50", "--xor-mask", "0xFF"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
}
