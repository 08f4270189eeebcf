//! `ms env` against a real workspace on disk.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
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

/// Two repositories, `core-service` (cs) and `db` (db), with the given
/// env rules and env file contents.
fn workspace(env: serde_json::Value, core_env: Option<&str>, db_env: Option<&str>) -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    for name in ["core-service", "db"] {
        fs::create_dir_all(root.join(name).join(".git")).unwrap();
    }
    if let Some(content) = core_env {
        fs::write(root.join("core-service/.env"), content).unwrap();
    }
    if let Some(content) = db_env {
        fs::write(root.join("db/.env"), content).unwrap();
    }

    let config = json!({
        "schemaVersion": 1,
        "env": env,
        "repositories": [
            { "name": "core-service", "alias": "cs", "envFile": ".env" },
            {
                "name": "db",
                "alias": "db",
                "type": "db-alembic",
                "envFile": ".env",
                "alembic": { "revisionsDirectory": "migrations/versions" }
            }
        ]
    });
    fs::write(
        root.join("ms-config.json"),
        serde_json::to_string_pretty(&config).unwrap(),
    )
    .unwrap();
    dir
}

fn strict() -> serde_json::Value {
    json!({ "mode": "strict", "missingEnvFile": "warn" })
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn ls_shows_sorted_vars_for_one_repo() {
    let ws = workspace(
        strict(),
        Some("ZED=1\nAPI_URL=http://localhost\n"),
        Some("DB_NAME=app\n"),
    );

    ms(ws.path())
        .args(["cs", "env", "ls"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--- core-service (.env) ---"))
        .stdout(predicate::str::is_match("API_URL=http://localhost\nZED=1").unwrap())
        .stdout(predicate::str::contains("DB_NAME").not());
}

#[test]
fn ls_without_selection_lists_every_repo() {
    let ws = workspace(strict(), Some("A=1\n"), Some("B=2\n"));

    ms(ws.path())
        .args(["env", "ls"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--- core-service (.env) ---"))
        .stdout(predicate::str::contains("--- db (.env) ---"))
        .stdout(predicate::str::contains("B=2"));
}

#[test]
fn strict_conflict_exits_with_conflict_code() {
    let ws = workspace(strict(), Some("DATABASE=app\n"), Some("DATABASE=other\n"));

    ms(ws.path())
        .args(["cs", "env", "ls"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains(
            "Conflict for key 'DATABASE': core-service=app vs db=other",
        ));
}

#[test]
fn warn_mode_reports_conflict_and_succeeds() {
    let ws = workspace(
        json!({ "mode": "warn" }),
        Some("DATABASE=app\n"),
        Some("DATABASE=other\n"),
    );

    ms(ws.path())
        .args(["env", "check"])
        .assert()
        .success()
        .stderr(predicate::str::contains("core-service=app vs db=other"));
}

#[test]
fn ignored_keys_do_not_conflict() {
    let ws = workspace(
        json!({ "mode": "strict", "ignoreKeys": ["DATABASE"] }),
        Some("DATABASE=app\n"),
        Some("DATABASE=other\n"),
    );

    ms(ws.path()).args(["env", "check"]).assert().success();
}

#[test]
fn missing_env_file_is_listed_under_warn_policy() {
    let ws = workspace(strict(), None, Some("A=1\n"));

    ms(ws.path())
        .args(["cs", "env", "ls"])
        .assert()
        .success()
        .stdout(predicate::str::contains("core-service").and(predicate::str::contains("(missing)")));
}

#[test]
fn missing_env_file_fails_under_strict_policy() {
    let ws = workspace(
        json!({ "mode": "strict", "missingEnvFile": "strict" }),
        None,
        Some("A=1\n"),
    );

    ms(ws.path())
        .args(["cs", "env", "ls"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Env file missing"));
}

#[test]
fn set_updates_the_env_file() {
    let ws = workspace(strict(), Some("# service\nAPI_URL=old\nOTHER=x\n"), Some("B=2\n"));

    ms(ws.path())
        .args(["cs", "env", "set", "API_URL", "http://new"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Current API_URL: old"))
        .stdout(predicate::str::contains("Updated API_URL."));

    let content = read(&ws.path().join("core-service/.env"));
    assert!(content.contains("API_URL=http://new"));
    assert!(content.contains("# service"));
    assert!(content.contains("OTHER=x"));
}

#[test]
fn set_same_value_leaves_file_alone() {
    let ws = workspace(strict(), Some("API_URL=same\n"), Some("B=2\n"));

    ms(ws.path())
        .args(["cs", "env", "set", "API_URL", "same"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Value unchanged."));
}

#[test]
fn set_with_empty_answer_makes_no_change() {
    let ws = workspace(strict(), Some("API_URL=old\n"), Some("B=2\n"));

    ms(ws.path())
        .args(["cs", "env", "set", "API_URL"])
        .write_stdin("\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes made."));

    assert_eq!(read(&ws.path().join("core-service/.env")), "API_URL=old\n");
}

#[test]
fn set_reads_value_from_stdin() {
    let ws = workspace(strict(), Some("API_URL=old\n"), Some("B=2\n"));

    ms(ws.path())
        .args(["cs", "env", "set", "NEW_KEY"])
        .write_stdin("fresh\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("NEW_KEY not set."));

    assert!(read(&ws.path().join("core-service/.env")).contains("NEW_KEY=fresh"));
}

#[test]
fn set_creating_a_conflict_fails_after_writing() {
    let ws = workspace(strict(), Some("DATABASE=app\n"), Some("DATABASE=app\n"));

    ms(ws.path())
        .args(["cs", "env", "set", "DATABASE", "changed"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Conflicts detected!"));

    assert!(read(&ws.path().join("core-service/.env")).contains("DATABASE=changed"));
}

#[test]
fn set_rejects_invalid_key() {
    let ws = workspace(strict(), Some("A=1\n"), Some("B=2\n"));

    ms(ws.path())
        .args(["cs", "env", "set", "bad-key", "x"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid env key 'bad-key'"));
}

#[test]
fn set_needs_exactly_one_repo() {
    let ws = workspace(strict(), Some("A=1\n"), Some("B=2\n"));

    ms(ws.path())
        .args(["env", "set", "A", "2"])
        .assert()
        .code(2);
}
