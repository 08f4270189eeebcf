//! Integration tests for ms-core, wired to the in-memory adapters.

use std::path::Path;
use std::sync::Arc;

use ms_adapters::{MemoryConfigStore, MemoryFilesystem, ScriptedRunner};
use ms_core::{
    application::{
        EnvService, GitService, MigrationService, MigrationTimeouts, ShellChange, ShellService,
        WorkspaceService, ports::CommandOutput,
    },
    domain::{MigrationPlan, RepoConfig, RepoKind, ShellKind, WorkspaceConfig, env, shell},
    error::{ErrorCategory, MsError},
    prelude::*,
};

const ROOT: &str = "/w";

fn workspace() -> WorkspaceConfig {
    let mut config = WorkspaceConfig::default();
    config.add_repo(RepoConfig::new("core-service", "cs")).unwrap();
    config
        .add_repo(RepoConfig::new("db", "db").with_alembic("migrations/versions"))
        .unwrap();
    config
}

#[test]
fn preflight_passes_for_a_complete_workspace() {
    let fs = MemoryFilesystem::new();
    fs.add_git_repo("/w/core-service").add_git_repo("/w/db");
    let store = MemoryConfigStore::with_config("/w/ms-config.json", workspace());

    let svc = WorkspaceService::new(Arc::new(store), Arc::new(fs), ROOT);
    let config = svc.preflight().unwrap();
    assert_eq!(config.repositories.len(), 2);
    assert_eq!(config.alembic_repo().map(|r| r.kind), Some(RepoKind::DbAlembic));
}

#[test]
fn preflight_names_the_missing_repo() {
    let fs = MemoryFilesystem::new();
    fs.add_git_repo("/w/core-service").add_dir("/w/db");
    let store = MemoryConfigStore::with_config("/w/ms-config.json", workspace());

    let err = WorkspaceService::new(Arc::new(store), Arc::new(fs), ROOT)
        .preflight()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Configured repo 'db' missing or not a git repo. Run: ms setup."
    );
    assert_eq!(err.category(), ErrorCategory::Preflight);
}

#[test]
fn discovery_skips_configured_and_plain_dirs() {
    let fs = MemoryFilesystem::new();
    fs.add_git_repo("/w/core-service")
        .add_git_repo("/w/db")
        .add_git_repo("/w/web")
        .add_dir("/w/notes");
    let store = MemoryConfigStore::with_config("/w/ms-config.json", workspace());

    let svc = WorkspaceService::new(Arc::new(store), Arc::new(fs), ROOT);
    let config = svc.load(true).unwrap();
    assert_eq!(svc.discover_candidates(&config).unwrap(), ["web"]);
}

#[test]
fn setup_starts_from_defaults_and_saves() {
    let store = MemoryConfigStore::new("/w/ms-config.json");
    let svc = WorkspaceService::new(Arc::new(store.clone()), Arc::new(MemoryFilesystem::new()), ROOT);

    let mut config = svc.load(false).unwrap();
    assert!(config.repositories.is_empty());
    config.add_repo(RepoConfig::new("web", "w")).unwrap();
    svc.save(&config).unwrap();

    assert_eq!(store.current().unwrap().repositories[0].alias, "w");
}

#[test]
fn env_set_then_check_reports_cross_repo_conflict() {
    let fs = MemoryFilesystem::new();
    fs.add_file("/w/core-service/.env", "# api\nDB_NAME=\"app\"\n")
        .add_file("/w/db/.env", "DB_NAME=app\n");
    let config = workspace();
    let svc = EnvService::new(Arc::new(fs.clone()), ROOT);

    assert!(svc.check(&config).unwrap().is_empty());

    let db = config.require_repo("db").unwrap();
    assert!(svc.set(db, "DB_NAME", "other").unwrap());
    assert_eq!(fs.read_file("/w/db/.env").as_deref(), Some("DB_NAME=other\n"));

    let conflicts = svc.check(&config).unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(
        conflicts[0].to_string(),
        "Conflict for key 'DB_NAME': core-service=app vs db=other"
    );

    let err: MsError = env::enforce(config.env.mode, &conflicts).unwrap_err().into();
    assert_eq!(err.category(), ErrorCategory::EnvConflict);
}

#[test]
fn git_status_splits_tracking_line() {
    let runner = ScriptedRunner::new()
        .on("git rev-parse --abbrev-ref HEAD", CommandOutput::ok("feature\n"))
        .on(
            "git status -sb",
            CommandOutput::ok("## feature...origin/feature [ahead 1]\n M src/main.py\n"),
        );
    let git = GitService::new(Arc::new(runner.clone()), "origin");

    let status = git.status(Path::new("/w/core-service")).unwrap();
    assert_eq!(status.branch, "feature");
    assert_eq!(status.tracking.as_deref(), Some("[ahead 1]"));
    assert_eq!(status.changes, [" M src/main.py"]);
    assert_eq!(
        runner.call_lines(),
        ["git rev-parse --abbrev-ref HEAD", "git status -sb"]
    );
}

#[test]
fn migration_plan_downgrades_to_common_ancestor() {
    let fs = MemoryFilesystem::new();
    fs.add_file("/w/db/.venv/bin/alembic", "")
        .add_file("/w/db/.env", "DATABASE_URL=postgres://x\n");

    let runner = ScriptedRunner::new()
        .on("/w/db/.venv/bin/alembic current", CommandOutput::ok("feat00000002 (head)\n"))
        .on(
            "git ls-tree --name-only feature:migrations/versions",
            CommandOutput::ok("001.py\n002.py\n"),
        )
        .on(
            "git ls-tree --name-only main:migrations/versions",
            CommandOutput::ok("001.py\n003.py\n"),
        )
        .on(
            "git show feature:migrations/versions/001.py",
            CommandOutput::ok("revision = 'base00000001'\ndown_revision = None\n"),
        )
        .on(
            "git show feature:migrations/versions/002.py",
            CommandOutput::ok("revision = 'feat00000002'\ndown_revision = 'base00000001'\n"),
        )
        .on(
            "git show main:migrations/versions/001.py",
            CommandOutput::ok("revision = 'base00000001'\ndown_revision = None\n"),
        )
        .on(
            "git show main:migrations/versions/003.py",
            CommandOutput::ok("revision: str = \"main00000003\"\ndown_revision = 'base00000001'\n"),
        );

    let runner: Arc<dyn CommandRunner> = Arc::new(runner);
    let svc = MigrationService::new(
        runner.clone(),
        Arc::new(fs),
        GitService::new(runner, "origin"),
        MigrationTimeouts::default(),
    );
    let config = workspace();
    let repo = config.require_repo("db").unwrap();

    let plan = svc
        .plan(Path::new("/w/db"), repo, "feature", "main")
        .unwrap();
    let MigrationPlan::Steps(steps) = plan else {
        panic!("expected migration steps, got {plan:?}");
    };
    assert!(steps.needs_downgrade);
    assert!(steps.needs_upgrade);
    assert_eq!(steps.downgrade_target(), Some("base00000001"));
    assert_eq!(steps.target_head.as_deref(), Some("main00000003"));
}

#[test]
fn shell_install_twice_leaves_one_block() {
    let fs = MemoryFilesystem::new();
    fs.add_file("/h/.zshrc", "export EDITOR=vim\n");
    let svc = ShellService::new(Arc::new(fs.clone()));
    let rc = Path::new("/h/.zshrc");

    let first = svc
        .install(rc, ShellKind::Zsh, ("linux", "x86_64"), "20260101000000")
        .unwrap();
    assert!(matches!(first, ShellChange::Written { backup: Some(_), .. }));
    assert_eq!(
        fs.read_file("/h/.zshrc.ms-backup-20260101000000").as_deref(),
        Some("export EDITOR=vim\n")
    );

    let second = svc
        .install(rc, ShellKind::Zsh, ("linux", "x86_64"), "20260101000001")
        .unwrap();
    assert_eq!(second, ShellChange::Unchanged);

    let content = fs.read_file(rc).unwrap();
    assert_eq!(content.matches(shell::BLOCK_START).count(), 1);
    assert!(content.starts_with("export EDITOR=vim\n"));
    assert!(svc.is_installed(rc).unwrap());

    svc.uninstall(rc, "20260101000002").unwrap();
    assert_eq!(fs.read_file(rc).as_deref(), Some("export EDITOR=vim\n"));
}
