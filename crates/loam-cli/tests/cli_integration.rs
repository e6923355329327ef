//! CLI subprocess integration tests.
//!
//! These tests invoke the `loam` binary as a subprocess and verify exit
//! codes, stdout content, and the structured output contract. Platform
//! clients are pointed at binaries that do not exist, so every verb that
//! reaches adapter construction fails deterministically.

use std::path::Path;
use std::process::Command;

fn loam_bin(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_loam"));
    cmd.env("LOAM_SKIP_PREREQS", "1");
    cmd.env("LOAM_KUBECTL", "loam-test-missing-kubectl");
    cmd.env("LOAM_DOCKER", "loam-test-missing-docker");
    cmd.env("HOME", home);
    cmd.env_remove("LOAM_PUSH_TARGET");
    cmd.env_remove("LOAM_LOG");
    cmd
}

fn write_devfile(dir: &Path) {
    std::fs::write(
        dir.join("devfile.toml"),
        r#"schema_version = "2.0.0"

[metadata]
name = "web"

[[components]]
name = "runtime"
image = "node:18-slim"

[[components.endpoints]]
name = "http"
port = 3000

[[commands]]
id = "build"
kind = "build"
component = "runtime"
command_line = "npm install"
default = true

[[commands]]
id = "run"
kind = "run"
component = "runtime"
command_line = "npm start"
default = true
"#,
    )
    .unwrap();
}

#[test]
fn cli_version_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = loam_bin(home.path()).arg("--version").output().unwrap();
    assert!(output.status.success(), "loam --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("loam"), "version output must contain 'loam': {stdout}");
}

#[test]
fn cli_help_lists_verbs() {
    let home = tempfile::tempdir().unwrap();
    let output = loam_bin(home.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for verb in ["push", "log", "delete", "exec", "test", "doctor"] {
        assert!(stdout.contains(verb), "help must list '{verb}': {stdout}");
    }
}

#[test]
fn cli_push_json_failure_emits_single_event() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    write_devfile(project.path());

    let output = loam_bin(home.path())
        .args(["--json", "--context"])
        .arg(project.path())
        .arg("push")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().filter(|l| !l.trim().is_empty()).collect();
    assert_eq!(lines.len(), 1, "exactly one event line expected: {stdout}");
    let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    let message = event["error"]["message"].as_str().unwrap();
    assert!(message.contains("cluster"), "{message}");
    assert!(event["error"]["timestamp"].as_str().unwrap().contains('.'));
}

#[test]
fn cli_push_failure_without_json_goes_to_stderr() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    write_devfile(project.path());

    let output = loam_bin(home.path())
        .arg("--context")
        .arg(project.path())
        .arg("push")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("\"error\""));
}

#[test]
fn cli_push_json_invalid_devfile_is_structured() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    std::fs::write(project.path().join("devfile.toml"), "schema_version = ").unwrap();

    let output = loam_bin(home.path())
        .args(["--json", "--context"])
        .arg(project.path())
        .arg("push")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let event: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert!(event["error"]["message"].is_string());
}

#[test]
fn cli_push_local_engine_target_from_env() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    write_devfile(project.path());

    let output = loam_bin(home.path())
        .env("LOAM_PUSH_TARGET", "local-engine")
        .args(["--json", "--context"])
        .arg(project.path())
        .arg("push")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let event: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert!(event["error"]["message"]
        .as_str()
        .unwrap()
        .contains("local-engine"));
}

#[test]
fn cli_invalid_push_target_fails() {
    let home = tempfile::tempdir().unwrap();
    let output = loam_bin(home.path())
        .env("LOAM_PUSH_TARGET", "mainframe")
        .arg("doctor")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn cli_log_debug_without_debug_command_fails() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    write_devfile(project.path());

    let output = loam_bin(home.path())
        .arg("--context")
        .arg(project.path())
        .args(["log", "--debug"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("loam log"), "stderr: {stderr}");
}

/// Install a stand-in kubectl that answers the client probe and fails `logs`.
#[cfg(unix)]
fn write_failing_kubectl(dir: &Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("kubectl");
    std::fs::write(
        &path,
        r#"#!/bin/sh
for arg in "$@"; do
  if [ "$arg" = "logs" ]; then
    echo 'Error from server (NotFound): pods "web-app" not found' >&2
    exit 1
  fi
done
exit 0
"#,
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[test]
fn cli_log_fails_when_platform_log_command_fails() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let tools = tempfile::tempdir().unwrap();
    write_devfile(project.path());
    let kubectl = write_failing_kubectl(tools.path());

    let output = loam_bin(home.path())
        .env("LOAM_KUBECTL", &kubectl)
        .arg("--context")
        .arg(project.path())
        .arg("log")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {stderr}");
    assert!(stderr.contains("web"), "stderr: {stderr}");
}

#[test]
fn cli_missing_devfile_fails() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();

    let output = loam_bin(home.path())
        .arg("--context")
        .arg(project.path())
        .args(["exec", "--", "ls"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn cli_exec_requires_command() {
    let home = tempfile::tempdir().unwrap();
    let output = loam_bin(home.path()).arg("exec").output().unwrap();
    assert_eq!(output.status.code(), Some(2), "clap usage errors exit 2");
}

#[test]
fn cli_doctor_json_is_valid() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    write_devfile(project.path());

    let output = loam_bin(home.path())
        .args(["--json", "--context"])
        .arg(project.path())
        .arg("doctor")
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("doctor --json must produce valid JSON: {e}\n{stdout}"));
    assert!(json["healthy"].is_boolean());
    let checks = json["checks"].as_array().unwrap();
    let devfile = checks.iter().find(|c| c["name"] == "devfile").unwrap();
    assert_eq!(devfile["status"], "pass");
}

#[test]
fn cli_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    let output = loam_bin(home.path())
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("loam"));
}

#[test]
fn cli_man_pages_written() {
    let home = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let output = loam_bin(home.path())
        .arg("man-pages")
        .arg(out.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(out.path().join("loam.1").exists());
    assert!(out.path().join("loam-push.1").exists());
}
