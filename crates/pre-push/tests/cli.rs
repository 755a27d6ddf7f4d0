//! End-to-end CLI integration tests.
//!
//! These tests invoke the compiled binary as a subprocess to verify that
//! the CLI behaves correctly from a user's perspective.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

fn manifest_project(tmp: &TempDir) {
    fs::write(
        tmp.path().join(".project.yml"),
        r#"
project:
  name: demo
  modules: [demo]
actions:
  - name: lint
    run: "echo linting"
  - name: test
    run: "echo testing"
    require: [lint]
stages:
  pre-push:
    steps:
      - action: lint
      - action: test
        require: [lint]
"#,
    )
    .unwrap();
}

fn git_init(tmp: &TempDir) {
    std::process::Command::new("git")
        .args(["init", "--quiet"])
        .current_dir(tmp.path())
        .status()
        .expect("git must be on PATH for install tests");
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"));
}

#[test]
fn version_flag_shows_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// =============================================================================
// list-uses
// =============================================================================

#[test]
fn list_uses_reports_builtin_registry() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .success()
        .stdout(predicate::str::contains("git@untracked"))
        .stdout(predicate::str::contains("git@uncommitted"))
        .stdout(predicate::str::contains("git@modified"));
}

#[test]
fn list_uses_does_not_require_a_manifest() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

#[test]
fn list_uses_json_is_valid_and_lists_descriptions() {
    let tmp = TempDir::new().unwrap();

    let output = cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "--json", "list-uses"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let entries = json.as_array().unwrap();
    assert!(entries.iter().any(|e| e["name"] == "git@untracked"));
    assert!(entries
        .iter()
        .all(|e| e["description"].as_str().is_some_and(|d| !d.is_empty())));
}

// =============================================================================
// test
// =============================================================================

#[test]
fn test_command_runs_stage_successfully() {
    let tmp = TempDir::new().unwrap();
    manifest_project(&tmp);

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "test"])
        .assert()
        .success();
}

#[test]
fn test_command_fails_when_a_step_errors() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".project.yml"),
        r#"
project:
  name: demo
  modules: [demo]
actions:
  - name: broken
    run: "false"
stages:
  pre-push:
    steps:
      - action: broken
"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "test"])
        .assert()
        .failure();
}

// =============================================================================
// install
// =============================================================================

#[test]
fn install_writes_executable_hook() {
    let tmp = TempDir::new().unwrap();
    git_init(&tmp);

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "install"])
        .assert()
        .success();

    let hook_path = tmp.path().join(".git").join("hooks").join("pre-push");
    assert!(hook_path.exists());
}

#[test]
fn install_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    git_init(&tmp);

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "install"])
        .assert()
        .success();
    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "install"])
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));
}

#[test]
fn install_outside_repo_fails() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "install"])
        .assert()
        .failure();
}

// =============================================================================
// Hook invocation (no subcommand, stdin piped)
// =============================================================================

#[test]
fn hook_invocation_with_piped_stdin_runs_the_hook_path() {
    let tmp = TempDir::new().unwrap();
    git_init(&tmp);
    manifest_project(&tmp);

    // A ref-deletion update (all-zero local SHA) is the simplest line that
    // reaches the hook path's push classifier and returns a decision
    // without depending on what's currently checked out.
    let stdin = "refs/heads/main 0000000000000000000000000000000000000000 \
                 refs/heads/main 1111111111111111111111111111111111111111\n";

    cmd()
        .current_dir(tmp.path())
        .args(["origin", "https://example.invalid/repo.git"])
        .write_stdin(stdin)
        .assert()
        .success()
        .stderr(predicate::str::contains("skipping checks (ref deletion)"));
}

#[test]
fn hook_invocation_with_empty_stdin_is_a_no_op_success() {
    let tmp = TempDir::new().unwrap();
    git_init(&tmp);
    manifest_project(&tmp);

    cmd()
        .current_dir(tmp.path())
        .args(["origin", "https://example.invalid/repo.git"])
        .write_stdin("")
        .assert()
        .success();
}
