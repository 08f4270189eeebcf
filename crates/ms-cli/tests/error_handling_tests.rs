//! Confirmation handling and the interactive setup flow, driven by piped
//! stdin.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ms(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ms").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("MS_LOG_FILE");
    cmd
}

fn single_repo_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("core-service/.git")).unwrap();
    fs::write(
        dir.path().join("ms-config.json"),
        r#"{
  "schemaVersion": 1,
  "repositories": [{ "name": "core-service", "alias": "cs" }]
}"#,
    )
    .unwrap();
    dir
}

#[test]
fn declined_reset_is_cancelled() {
    let ws = single_repo_workspace();
    let before = fs::read_to_string(ws.path().join("ms-config.json")).unwrap();

    ms(ws.path())
        .args(["reset", "main"])
        .write_stdin("n\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("discards local commits"))
        .stderr(predicate::str::contains("Operation cancelled"));

    assert_eq!(
        fs::read_to_string(ws.path().join("ms-config.json")).unwrap(),
        before
    );
}

#[test]
fn reset_with_no_input_defaults_to_no() {
    let ws = single_repo_workspace();

    ms(ws.path())
        .args(["reset", "main"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Operation cancelled"));
}

#[test]
fn prune_without_force_only_warns() {
    let ws = single_repo_workspace();

    ms(ws.path())
        .arg("prune")
        .assert()
        .success()
        .stderr(predicate::str::contains("Operation requires --force"));
}

#[test]
fn unsupported_schema_version_fails_preflight() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("ms-config.json"),
        r#"{ "schemaVersion": 2, "repositories": [] }"#,
    )
    .unwrap();

    ms(dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported schemaVersion: 2"));
}

#[test]
fn setup_adds_a_discovered_repo() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("core-service/.git")).unwrap();
    fs::create_dir_all(dir.path().join("notes")).unwrap();

    // Add repo, pick #1, alias, type, env file, colour #1, then exit.
    ms(dir.path())
        .arg("setup")
        .write_stdin("1\n1\ncs\napp\n.env\n1\n5\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Repo core-service added."));

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("ms-config.json")).unwrap())
            .unwrap();
    assert_eq!(saved["schemaVersion"], 1);
    let repos = saved["repositories"].as_array().unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0]["name"], "core-service");
    assert_eq!(repos[0]["alias"], "cs");
    assert_eq!(repos[0]["type"], "app");
}

#[test]
fn setup_with_closed_stdin_writes_default_config() {
    let dir = TempDir::new().unwrap();

    ms(dir.path()).arg("setup").write_stdin("").assert().success();

    let saved = fs::read_to_string(dir.path().join("ms-config.json")).unwrap();
    assert!(saved.contains("\"schemaVersion\": 1"));
}
