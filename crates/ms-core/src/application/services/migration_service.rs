//! Migration Service - alembic revisions of the `db-alembic` repository.
//!
//! Alembic always runs from the repository's own virtualenv with the
//! repository's env file merged into the process environment, so the
//! database URL comes from the same place the application reads it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        ApplicationError,
        ports::{CommandOutput, CommandRunner, CommandSpec, Filesystem},
        services::{GitService, VenvService},
    },
    domain::{DomainError, MigrationPlan, RepoConfig, Revision, env, migration},
    error::MsResult,
};

/// How long alembic may run before it is assumed to be stuck on the
/// database connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationTimeouts {
    pub current: Duration,
    pub migrate: Duration,
}

impl Default for MigrationTimeouts {
    fn default() -> Self {
        Self {
            current: Duration::from_secs(25),
            migrate: Duration::from_secs(30),
        }
    }
}

pub struct MigrationService {
    runner: Arc<dyn CommandRunner>,
    fs: Arc<dyn Filesystem>,
    git: GitService,
    timeouts: MigrationTimeouts,
}

impl MigrationService {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        fs: Arc<dyn Filesystem>,
        git: GitService,
        timeouts: MigrationTimeouts,
    ) -> Self {
        Self {
            runner,
            fs,
            git,
            timeouts,
        }
    }

    pub fn alembic_path(dir: &Path) -> PathBuf {
        VenvService::venv_path(dir).join("bin").join("alembic")
    }

    fn alembic(&self, dir: &Path, repo: &RepoConfig, args: &[&str], timeout: Duration) -> MsResult<CommandOutput> {
        let bin = Self::alembic_path(dir);
        if !self.fs.exists(&bin) {
            return Err(ApplicationError::AlembicNotFound {
                path: dir.to_path_buf(),
            }
            .into());
        }

        let mut spec = CommandSpec::new(bin.display().to_string())
            .cwd(dir)
            .args(args.iter().copied())
            .env("VIRTUAL_ENV", VenvService::venv_path(dir).display().to_string())
            .timeout(timeout);
        if let Some(content) = self.fs.read_to_string(&dir.join(&repo.env_file))? {
            for (key, value) in env::parse(&content) {
                spec = spec.env(key, env::normalize_value(&value));
            }
        }
        debug!(command = %spec, "Running alembic");
        self.runner.capture(&spec)
    }

    /// Revision the database is at.
    #[instrument(skip_all, fields(repo = %repo.name))]
    pub fn current_revision(&self, dir: &Path, repo: &RepoConfig) -> MsResult<String> {
        let out = self.alembic(dir, repo, &["current"], self.timeouts.current)?;
        if out.success() {
            return migration::parse_current_revision(&out.stdout)
                .ok_or_else(|| ApplicationError::UnknownDbRevision.into());
        }
        if let Some(rev) = migration::parse_missing_revision(&out.stderr) {
            debug!(revision = %rev, "Recovered revision from alembic error");
            return Ok(rev);
        }
        warn!(stderr = %out.stderr.trim(), "alembic current failed");
        Err(ApplicationError::command_failed("alembic current", out.status, &out.stderr).into())
    }

    fn revisions_dir(repo: &RepoConfig) -> MsResult<String> {
        repo.revisions_directory()
            .map(|d| d.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                DomainError::MissingRevisionsDirectory {
                    repo: repo.name.clone(),
                }
                .into()
            })
    }

    /// Revision files committed on `branch`. Subdirectories are not
    /// searched.
    pub fn revisions_in_branch(&self, dir: &Path, branch: &str, revisions_dir: &str) -> Vec<Revision> {
        let Some(listing) = self.git.ls_tree(dir, branch, revisions_dir) else {
            return Vec::new();
        };
        migration::revision_files(&listing)
            .into_iter()
            .filter_map(|name| {
                let path = format!("{revisions_dir}/{name}");
                let content = self.git.show_file(dir, branch, &path)?;
                migration::parse_revision_file(&content, path)
            })
            .collect()
    }

    /// Local branches whose revisions include `revision`.
    pub fn branches_containing(&self, dir: &Path, revision: &str, revisions_dir: &str) -> Vec<String> {
        self.git
            .local_branches(dir)
            .into_iter()
            .filter(|b| {
                self.revisions_in_branch(dir, b, revisions_dir)
                    .iter()
                    .any(|r| r.id == revision)
            })
            .collect()
    }

    /// Plan the database moves for switching `current_branch` to
    /// `target_branch`.
    #[instrument(skip(self, dir, repo), fields(repo = %repo.name))]
    pub fn plan(
        &self,
        dir: &Path,
        repo: &RepoConfig,
        current_branch: &str,
        target_branch: &str,
    ) -> MsResult<MigrationPlan> {
        let revisions_dir = Self::revisions_dir(repo)?;
        let db_revision = self.current_revision(dir, repo)?;
        let current = self.revisions_in_branch(dir, current_branch, &revisions_dir);
        let target = self.revisions_in_branch(dir, target_branch, &revisions_dir);
        debug!(
            db = %db_revision,
            current = current.len(),
            target = target.len(),
            "Revisions loaded"
        );

        match migration::plan(&db_revision, &current, &target) {
            MigrationPlan::Unreachable { revision } => {
                let found_in_branches = self.branches_containing(dir, &revision, &revisions_dir);
                Err(DomainError::UnreachableRevision {
                    revision,
                    found_in_branches,
                }
                .into())
            }
            plan => Ok(plan),
        }
    }

    fn migrate(&self, dir: &Path, repo: &RepoConfig, args: &[&str]) -> MsResult<()> {
        let out = self.alembic(dir, repo, args, self.timeouts.migrate)?;
        if out.success() {
            Ok(())
        } else {
            Err(ApplicationError::command_failed(
                format!("alembic {}", args.join(" ")),
                out.status,
                &out.stderr,
            )
            .into())
        }
    }

    pub fn downgrade(&self, dir: &Path, repo: &RepoConfig, revision: &str) -> MsResult<()> {
        self.migrate(dir, repo, &["downgrade", revision])?;
        info!(revision, "Downgrade complete");
        Ok(())
    }

    pub fn upgrade(&self, dir: &Path, repo: &RepoConfig) -> MsResult<()> {
        self.migrate(dir, repo, &["upgrade", "head"])?;
        info!("Upgrade complete");
        Ok(())
    }
}
