//! Tests for the --debug tracing output

use snrebin::payload::SnPayload;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn get_binary_path() -> String {
    env!("CARGO_BIN_EXE_snrebin").to_string()
}

fn payload_file(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("sn.dat");
    fs::write(&path, SnPayload::new(0, 0x5, 0, vec![0, 10]).encode().unwrap()).unwrap();
    path
}

#[test]
fn test_debug_output_to_stderr() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(get_binary_path())
        .arg("--debug")
        .arg(payload_file(&dir))
        .output()
        .expect("Failed to execute");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success());
    assert!(
        stderr.contains("starting snrebin"),
        "No tracing output found in stderr: {}",
        stderr
    );
}

#[test]
fn test_debug_traces_boundary_splits() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(get_binary_path())
        .arg("--debug")
        .arg(payload_file(&dir))
        .output()
        .expect("Failed to execute");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("split scaler across 2 ms boundary"),
        "Split was not traced: {}",
        stderr
    );
}

#[test]
fn test_no_tracing_without_debug() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(get_binary_path())
        .arg(payload_file(&dir))
        .output()
        .expect("Failed to execute");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success());
    assert!(stderr.is_empty(), "Unexpected stderr: {}", stderr);
}
