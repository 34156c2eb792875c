//! Runs the `conmon` binary and checks what a caller observes: the text on
//! stdout and stderr, and the exit status.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;
use std::process::{Command, Output};
use std::time::{Duration, Instant};

const CTR_ID: &str = "abcdefghijklm";

fn conmon() -> Command {
    Command::new(env!("CARGO_BIN_EXE_conmon"))
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn with_identity<'a>(cmd: &'a mut Command, runtime: &Path) -> &'a mut Command {
    cmd.args(["--cid", CTR_ID, "--cuuid", CTR_ID])
        .arg("--runtime")
        .arg(runtime)
}

/// Uses `sh -c <script>` as the OCI runtime. The runtime subcommand and the
/// container ID end up as the script's positional parameters.
fn with_shell_runtime<'a>(cmd: &'a mut Command, script: &str) -> &'a mut Command {
    with_identity(cmd, Path::new("/bin/sh"))
        .arg("--runtime-arg=-c")
        .arg(format!("--runtime-arg={script}"))
}

// ── Version query ────────────────────────────────────────────────────

#[test]
fn version_prints_to_stdout_and_succeeds() {
    let output = conmon().arg("--version").output().expect("spawn conmon");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("conmon version"), "got: {stdout}");
    assert!(stdout.contains("commit:"), "got: {stdout}");
    assert!(output.stderr.is_empty(), "got: {}", stderr(&output));
}

// ── Validation failures ──────────────────────────────────────────────

#[test]
fn missing_container_id_exits_one_with_prefixed_message() {
    let output = conmon().output().expect("spawn conmon");
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(
        err.contains("conmon: Container ID not provided. Use --cid"),
        "got: {err}"
    );
}

#[test]
fn invalid_runtime_path_exits_one() {
    let output = with_identity(&mut conmon(), Path::new("/not/a/path"))
        .output()
        .expect("spawn conmon");
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(
        err.contains("conmon: Runtime path /not/a/path is not valid"),
        "got: {err}"
    );
}

#[test]
fn unknown_log_level_exits_one() {
    let output = conmon()
        .args(["--log-level", "loud"])
        .output()
        .expect("spawn conmon");
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("conmon: No such log level loud"), "got: {err}");
}

#[test]
fn unknown_log_driver_exits_one_without_creating_logs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("log");
    let output = with_identity(&mut conmon(), dir.path())
        .arg("--log-path")
        .arg(format!("k8s-file:{}", log.display()))
        .arg("--log-path")
        .arg(format!("invalid:{}", log.display()))
        .output()
        .expect("spawn conmon");
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("conmon: No such log driver invalid"), "got: {err}");
    assert!(!log.exists());
}

// ── Supervision ──────────────────────────────────────────────────────

#[test]
fn exits_with_container_code_and_logs_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("ctr.log");
    let output = with_shell_runtime(&mut conmon(), "echo hello; exit 3")
        .arg("--log-path")
        .arg(format!("k8s-file:{}", log.display()))
        .output()
        .expect("spawn conmon");

    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
    let content = std::fs::read_to_string(&log).expect("read log");
    assert!(content.contains(" stdout F hello\n"), "got: {content}");
}

#[test]
fn timeout_kills_runtime() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("ctr.log");

    let started = Instant::now();
    let output = with_shell_runtime(&mut conmon(), "exec sleep 30")
        .arg("--log-path")
        .arg(&log)
        .args(["--timeout", "1"])
        .output()
        .expect("spawn conmon");

    assert!(started.elapsed() < Duration::from_secs(20));
    assert_eq!(output.status.code(), Some(128 + 9), "stderr: {}", stderr(&output));
}
