//! Everything a command handler needs: flags, settings, output, prompts,
//! and the adapters behind the core services.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use ms_adapters::{JsonConfigStore, LocalFilesystem, SystemRunner};
use ms_core::application::ApplicationError;
use ms_core::prelude::*;

use crate::{
    cli::GlobalArgs,
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    interact::{Prompter, default_prompter},
    output::OutputManager,
};

pub struct Context {
    pub global: GlobalArgs,
    pub config: AppConfig,
    pub output: OutputManager,
    pub prompter: Box<dyn Prompter>,
    pub runner: Arc<dyn CommandRunner>,
    pub fs: Arc<dyn Filesystem>,
    pub workspace: WorkspaceService,
}

impl Context {
    /// Wire the production adapters with the current directory as the
    /// workspace root.
    pub fn new(global: GlobalArgs, config: AppConfig, output: OutputManager) -> CliResult<Self> {
        let root = std::env::current_dir().with_cli_context(|| "Cannot read current directory")?;
        debug!(root = %root.display(), "Workspace root");

        let fs: Arc<dyn Filesystem> = Arc::new(LocalFilesystem::new());
        let store = Arc::new(JsonConfigStore::in_workspace(&root));
        Ok(Self {
            global,
            config,
            output,
            prompter: default_prompter(),
            runner: Arc::new(SystemRunner::new()),
            workspace: WorkspaceService::new(store, fs.clone(), root),
            fs,
        })
    }

    pub fn root(&self) -> &Path {
        self.workspace.root()
    }

    // ── Services ──────────────────────────────────────────────────────────

    pub fn git(&self) -> GitService {
        GitService::new(self.runner.clone(), self.config.git.remote.clone())
    }

    pub fn github(&self) -> GithubService {
        GithubService::new(self.runner.clone())
    }

    pub fn env(&self) -> EnvService {
        EnvService::new(self.fs.clone(), self.root().to_path_buf())
    }

    pub fn compose(&self) -> ComposeService {
        ComposeService::new(self.runner.clone(), self.fs.clone())
    }

    pub fn venv(&self) -> VenvService {
        VenvService::new(self.runner.clone(), self.fs.clone())
    }

    pub fn terraform(&self) -> TerraformService {
        TerraformService::new(self.runner.clone())
    }

    pub fn migration(&self) -> MigrationService {
        MigrationService::new(
            self.runner.clone(),
            self.fs.clone(),
            self.git(),
            self.config.migration.timeouts(),
        )
    }

    pub fn shell(&self) -> ShellService {
        ShellService::new(self.fs.clone())
    }

    // ── Workspace ─────────────────────────────────────────────────────────

    /// Load and check the workspace config.
    pub fn preflight(&self) -> CliResult<WorkspaceConfig> {
        Ok(self.workspace.preflight()?)
    }

    /// Repositories picked by `-r/--repo`, all of them when none given.
    pub fn selected<'a>(&self, config: &'a WorkspaceConfig) -> CliResult<Vec<&'a RepoConfig>> {
        Ok(config.select(&self.global.repos)?)
    }

    pub fn repo_dir(&self, repo: &RepoConfig) -> PathBuf {
        self.workspace.repo_dir(repo)
    }

    /// Run `f` for each repository. A failing repository is reported and
    /// the loop moves on; the command fails afterwards if any did. A
    /// declined confirmation skips that repository, and the command ends
    /// as cancelled when nothing else failed. A single repository's error
    /// is returned unchanged, so a passthrough command keeps its exit
    /// status.
    pub fn for_each_repo<F>(&self, repos: &[&RepoConfig], mut f: F) -> CliResult<()>
    where
        F: FnMut(&RepoConfig, &Path) -> CliResult<()>,
    {
        if let [repo] = repos {
            return f(repo, &self.repo_dir(repo));
        }

        let mut failed = 0;
        let mut cancelled = 0;
        for repo in repos {
            let dir = self.repo_dir(repo);
            match f(repo, &dir) {
                Ok(()) => {}
                Err(CliError::Cancelled) => {
                    cancelled += 1;
                    debug!(repo = %repo.name, "Skipped after declined confirmation");
                }
                Err(err) => {
                    failed += 1;
                    err.log();
                    if !err.is_silent() {
                        self.output.error(&format!("{}: {err}", repo.name))?;
                    }
                }
            }
        }
        if failed > 0 {
            return Err(ApplicationError::PartialFailure {
                failed,
                total: repos.len(),
            }
            .into());
        }
        if cancelled > 0 {
            return Err(CliError::Cancelled);
        }
        Ok(())
    }

    // ── Prompts ───────────────────────────────────────────────────────────

    /// Warn, then ask before a destructive operation. `--yes` or
    /// `prompt.confirm_destructive = false` skip the question.
    pub fn confirm_destructive(&self, warning: &str) -> CliResult<()> {
        if self.global.yes || !self.config.prompt.confirm_destructive {
            debug!("Confirmation skipped");
            return Ok(());
        }
        self.output.warning(warning)?;
        if self.prompter.confirm("Continue?", false)? {
            Ok(())
        } else {
            warn!("Destructive operation declined");
            Err(CliError::Cancelled)
        }
    }

    pub fn input(&self, prompt: &str, default: &str) -> CliResult<String> {
        Ok(self.prompter.input(prompt, default)?)
    }
}

/// Map a streamed command's exit status onto the CLI result.
pub fn forward(status: CommandStatus) -> CliResult<()> {
    if status.success() {
        Ok(())
    } else {
        Err(CliError::Forwarded {
            code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use ms_adapters::{MemoryConfigStore, MemoryFilesystem, ScriptedRunner};
    use ms_core::domain::RepoConfig;

    use super::*;
    use crate::interact::MockPrompter;

    fn context(prompter: MockPrompter) -> Context {
        let global = GlobalArgs {
            quiet: true,
            no_color: true,
            ..GlobalArgs::default()
        };
        let config = AppConfig::default();
        let output = OutputManager::new(&global, &config);
        let fs: Arc<dyn Filesystem> = Arc::new(MemoryFilesystem::new());
        Context {
            workspace: WorkspaceService::new(
                Arc::new(MemoryConfigStore::new("/w/ms-config.json")),
                fs.clone(),
                "/w",
            ),
            global,
            config,
            output,
            prompter: Box::new(prompter),
            runner: Arc::new(ScriptedRunner::new()),
            fs,
        }
    }

    fn repos() -> Vec<RepoConfig> {
        vec![RepoConfig::new("api", "a"), RepoConfig::new("web", "w")]
    }

    #[test]
    fn declined_everywhere_is_cancelled() {
        let mut prompter = MockPrompter::new();
        prompter.expect_confirm().times(2).returning(|_, _| Ok(false));
        let ctx = context(prompter);
        let repos = repos();
        let selected: Vec<&RepoConfig> = repos.iter().collect();

        let result = ctx.for_each_repo(&selected, |_, _| ctx.confirm_destructive("Deleting branches."));
        assert!(matches!(result, Err(CliError::Cancelled)));
    }

    #[test]
    fn real_failure_outranks_cancellation() {
        let mut prompter = MockPrompter::new();
        prompter.expect_confirm().returning(|_, _| Ok(false));
        let ctx = context(prompter);
        let repos = repos();
        let selected: Vec<&RepoConfig> = repos.iter().collect();

        let result = ctx.for_each_repo(&selected, |repo, _| {
            if repo.name == "api" {
                ctx.confirm_destructive("Deleting branches.")
            } else {
                Err(CliError::Forwarded { code: 1 })
            }
        });
        assert_eq!(result.unwrap_err().exit_code(), 1);
    }

    #[test]
    fn every_repo_runs_after_a_failure() {
        let ctx = context(MockPrompter::new());
        let repos = repos();
        let selected: Vec<&RepoConfig> = repos.iter().collect();
        let seen = RefCell::new(Vec::new());

        let result = ctx.for_each_repo(&selected, |repo, dir| {
            seen.borrow_mut().push(dir.to_path_buf());
            if repo.name == "api" {
                Err(CliError::Forwarded { code: 7 })
            } else {
                Ok(())
            }
        });
        assert_eq!(
            *seen.borrow(),
            [PathBuf::from("/w/api"), PathBuf::from("/w/web")]
        );
        assert_eq!(result.unwrap_err().exit_code(), 1);
    }

    #[test]
    fn single_repo_keeps_its_exit_code() {
        let ctx = context(MockPrompter::new());
        let repo = RepoConfig::new("api", "a");

        let result = ctx.for_each_repo(&[&repo], |_, _| Err(CliError::Forwarded { code: 7 }));
        assert_eq!(result.unwrap_err().exit_code(), 7);
    }
}
