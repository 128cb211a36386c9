//! CLI integration tests for the peerline binary

use std::io::Write;
use std::process::{Command, Stdio};

/// Run the binary with arguments and the given stdin
fn run_peerline(args: &[&str], stdin: &str) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_peerline"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");
    child.wait_with_output().expect("Failed to wait on command")
}

#[test]
fn test_cli_help() {
    let output = run_peerline(&["--help"], "");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("peerline"));
    assert!(stdout.contains("--connect-timeout"));
    assert!(stdout.contains("--send-timeout"));
}

#[test]
fn test_missing_listen_argument() {
    let output = run_peerline(&[], "");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"));
}

#[test]
fn test_invalid_listen_argument() {
    let output = run_peerline(&["not-a-port"], "");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid address"));
}

#[test]
fn test_session_exit() {
    let output = run_peerline(
        &["127.0.0.1:0", "--log-level", "error"],
        "foo\nconnect\nexit\n",
    );
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Node is listening on: /ip4/127.0.0.1/tcp/"));
    assert!(stdout.contains("/p2p/"));
    assert!(stdout.contains("Enter command (connect <peer-addr>, send <peer-id> <message>, exit):"));
    assert!(stdout.contains("Unknown command"));
    assert!(stdout.contains("Usage: connect <peer-addr>"));
    assert!(stdout.contains("Exiting..."));
}

#[test]
fn test_end_of_input_exits_cleanly() {
    let output = run_peerline(&["/ip4/127.0.0.1/tcp/0", "--log-level", "error"], "");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Node is listening on:"));
    assert!(!stdout.contains("Exiting..."));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("peerline.toml");
    let output = run_peerline(&["0", "--config", missing.to_str().unwrap()], "");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config error"));
}
