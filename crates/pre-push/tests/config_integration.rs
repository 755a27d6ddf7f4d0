//! Configuration integration tests.
//!
//! These tests verify config discovery, format parsing, and precedence
//! from an end-to-end perspective using the compiled binary. `list-uses`
//! is used as the driving subcommand: it loads ambient config the same
//! way every subcommand does, and needs no manifest or real `.git`
//! checkout to succeed.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

// =============================================================================
// Config File Discovery
// =============================================================================

#[test]
fn runs_without_config_file() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

#[test]
fn discovers_dotfile_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".pre-push.toml"), r#"log_level = "debug""#).unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

#[test]
fn discovers_regular_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("pre-push.toml"), r#"log_level = "warn""#).unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

#[test]
fn discovers_config_in_parent_directory() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("nested").join("deep");
    fs::create_dir_all(&sub_dir).unwrap();

    fs::write(tmp.path().join(".pre-push.toml"), r#"log_level = "debug""#).unwrap();

    cmd()
        .args(["-C", sub_dir.to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

#[test]
fn dotfile_takes_precedence_over_regular_name() {
    let tmp = TempDir::new().unwrap();

    fs::write(tmp.path().join(".pre-push.toml"), r#"log_level = "debug""#).unwrap();
    fs::write(tmp.path().join("pre-push.toml"), r#"log_level = "error""#).unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

// =============================================================================
// Config Format Parsing
// =============================================================================

#[test]
fn parses_toml_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".pre-push.toml"),
        r#"
log_level = "warn"
"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

#[test]
fn parses_yaml_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".pre-push.yaml"),
        r#"
log_level: warn
"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

#[test]
fn parses_yml_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".pre-push.yml"),
        r#"
log_level: debug
"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

#[test]
fn parses_json_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".pre-push.json"), r#"{"log_level": "error"}"#).unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

// =============================================================================
// Config Precedence
// =============================================================================

#[test]
fn closer_config_takes_precedence() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("project");
    fs::create_dir_all(&sub_dir).unwrap();

    fs::write(tmp.path().join(".pre-push.toml"), r#"log_level = "error""#).unwrap();
    fs::write(sub_dir.join(".pre-push.toml"), r#"log_level = "debug""#).unwrap();

    cmd()
        .args(["-C", sub_dir.to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

#[test]
fn toml_preferred_over_yaml_in_same_directory() {
    let tmp = TempDir::new().unwrap();

    fs::write(tmp.path().join(".pre-push.toml"), r#"log_level = "debug""#).unwrap();
    fs::write(tmp.path().join(".pre-push.yaml"), r#"log_level: error"#).unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn invalid_toml_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".pre-push.toml"), "this is not valid toml [[[").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration").or(predicate::str::contains("config")));
}

#[test]
fn invalid_yaml_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".pre-push.yaml"),
        "invalid:\n  yaml\n content:\n[broken",
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .failure();
}

#[test]
fn invalid_json_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".pre-push.json"), "{not valid json}").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .failure();
}

#[test]
fn unknown_config_field_is_ignored() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".pre-push.toml"),
        r#"
log_level = "info"
unknown_field = "should be ignored"
another_unknown = 42
"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

// =============================================================================
// Boundary Marker Tests
// =============================================================================

#[test]
fn git_boundary_stops_config_search() {
    let tmp = TempDir::new().unwrap();

    // Structure: parent/.pre-push.toml + parent/repo/.git/ + parent/repo/
    let parent = tmp.path().join("parent");
    let repo = parent.join("repo");
    fs::create_dir_all(&repo).unwrap();

    fs::write(parent.join(".pre-push.toml"), r#"log_level = "error""#).unwrap();
    fs::create_dir(repo.join(".git")).unwrap();

    // Running from repo/ should not see the parent's config (search stops
    // at the .git boundary), but should still succeed with defaults.
    cmd()
        .args(["-C", repo.to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}

#[test]
fn config_in_same_dir_as_git_is_found() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    fs::create_dir_all(&repo).unwrap();

    fs::create_dir(repo.join(".git")).unwrap();
    fs::write(repo.join(".pre-push.toml"), r#"log_level = "debug""#).unwrap();

    cmd()
        .args(["-C", repo.to_str().unwrap(), "list-uses"])
        .assert()
        .success();
}
