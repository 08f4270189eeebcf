//! Git Service - the per-repository git operations behind every fan-out
//! command, plus the read-only queries used by completion and the prompt.
//!
//! Operations that show git's own progress (fetch, pull, push, commit)
//! stream with the terminal attached; operations whose output `ms`
//! reformats are captured.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::{
    application::{
        ApplicationError,
        ports::{CommandOutput, CommandRunner, CommandSpec, CommandStatus},
    },
    domain::{DomainError, PromptInfo, git},
    error::MsResult,
};

/// `git status -sb`, split for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus {
    pub branch: String,
    /// Ahead/behind marker such as `[ahead 1]`.
    pub tracking: Option<String>,
    pub changes: Vec<String>,
}

/// Result of a hard reset to the remote branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetReport {
    /// `<remote>/<branch>`.
    pub target: String,
    /// `git status -sb` after the reset.
    pub status: String,
}

impl ResetReport {
    /// Lines to print: the reset target, then the status.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(format!("Reset hard to {}", self.target))
            .chain(self.status.lines().filter(|l| !l.is_empty()).map(str::to_owned))
    }
}

/// What `push` is about to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPlan {
    pub branch: String,
    pub set_upstream: bool,
    spec: CommandSpec,
}

pub struct GitService {
    runner: Arc<dyn CommandRunner>,
    remote: String,
}

impl GitService {
    pub fn new(runner: Arc<dyn CommandRunner>, remote: impl Into<String>) -> Self {
        Self {
            runner,
            remote: remote.into(),
        }
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    fn git<I, S>(dir: &Path, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new("git").cwd(dir).args(args)
    }

    fn capture<I, S>(&self, dir: &Path, args: I) -> MsResult<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner.capture(&Self::git(dir, args))
    }

    /// Capture and turn a non-zero exit into `CommandFailed`.
    fn capture_ok<I, S>(&self, dir: &Path, args: I) -> MsResult<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = Self::git(dir, args);
        let out = self.runner.capture(&spec)?;
        if out.success() {
            Ok(out.stdout)
        } else {
            Err(ApplicationError::command_failed(spec.display(), out.status, &out.stderr).into())
        }
    }

    fn stream<I, S>(&self, dir: &Path, args: I) -> MsResult<CommandStatus>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner.stream(&Self::git(dir, args))
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Checked-out branch, or `unknown` when git cannot tell.
    pub fn current_branch(&self, dir: &Path) -> String {
        match self.capture(dir, ["rev-parse", "--abbrev-ref", "HEAD"]) {
            Ok(out) if out.success() => out.stdout.trim().to_string(),
            _ => git::UNKNOWN_BRANCH.to_string(),
        }
    }

    pub fn status(&self, dir: &Path) -> MsResult<RepoStatus> {
        let branch = self.current_branch(dir);
        let stdout = self.capture_ok(dir, ["status", "-sb"])?;
        let (tracking, changes) = git::split_status(&stdout);
        Ok(RepoStatus {
            branch,
            tracking,
            changes: changes.into_iter().map(str::to_owned).collect(),
        })
    }

    pub fn local_branches(&self, dir: &Path) -> Vec<String> {
        self.capture(dir, ["branch", "--format=%(refname:short)"])
            .ok()
            .filter(CommandOutput::success)
            .map(|out| git::unique_lines(&out.stdout))
            .unwrap_or_default()
    }

    /// Branch names for shell completion. Never fails: git errors give an
    /// empty list.
    pub fn complete_branches(&self, dir: &Path, prefix: &str, remote: bool) -> Vec<String> {
        let args: &[&str] = if remote {
            &["branch", "-r", "--format=%(refname:short)"]
        } else {
            &["branch", "--format=%(refname:short)"]
        };
        let stdout = match self.capture(dir, args.iter().copied()) {
            Ok(out) if out.success() => out.stdout,
            _ => return Vec::new(),
        };
        if remote {
            git::complete_remote_branches(&stdout, &self.remote, prefix)
        } else {
            git::complete_branches(&stdout, prefix)
        }
    }

    /// Unstaged and staged paths, deduplicated.
    pub fn changed_files(&self, dir: &Path) -> Vec<String> {
        let list = |args: &[&str]| {
            self.capture(dir, args.iter().copied())
                .ok()
                .filter(CommandOutput::success)
                .map(|o| o.stdout)
                .unwrap_or_default()
        };
        let unstaged = list(&["diff", "--name-only"]);
        let staged = list(&["diff", "--name-only", "--cached"]);
        git::merge_file_lists(&[unstaged.as_str(), staged.as_str()])
    }

    /// Prompt data for the repo containing `dir`, `None` outside a repo.
    pub fn prompt_info(&self, dir: &Path) -> Option<PromptInfo> {
        let inside = self
            .capture(dir, ["rev-parse", "--is-inside-work-tree"])
            .ok()?;
        if !inside.success() || inside.stdout.trim() != "true" {
            return None;
        }

        let mut info = PromptInfo::new(self.current_branch(dir));
        info.dirty = self
            .capture(dir, ["status", "--porcelain"])
            .is_ok_and(|o| o.success() && !o.stdout.trim().is_empty());
        if let Some((ahead, behind)) = self
            .capture(dir, ["rev-list", "--left-right", "--count", "HEAD...@{upstream}"])
            .ok()
            .filter(CommandOutput::success)
            .and_then(|o| git::parse_ahead_behind(&o.stdout))
        {
            info.ahead = ahead;
            info.behind = behind;
        }
        Some(info)
    }

    pub fn remote_url(&self, dir: &Path) -> Option<String> {
        self.capture(dir, ["remote", "get-url", self.remote.as_str()])
            .ok()
            .filter(CommandOutput::success)
            .map(|o| o.stdout.trim().to_string())
            .filter(|u| !u.is_empty())
    }

    /// `git ls-tree --name-only <rev>:<path>`, `None` if the tree is absent.
    pub fn ls_tree(&self, dir: &Path, rev: &str, path: &str) -> Option<String> {
        self.capture(dir, ["ls-tree".to_string(), "--name-only".into(), format!("{rev}:{path}")])
            .ok()
            .filter(CommandOutput::success)
            .map(|o| o.stdout)
    }

    /// `git show <rev>:<path>`.
    pub fn show_file(&self, dir: &Path, rev: &str, path: &str) -> Option<String> {
        self.capture(dir, ["show".to_string(), format!("{rev}:{path}")])
            .ok()
            .filter(CommandOutput::success)
            .map(|o| o.stdout)
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    pub fn fetch(&self, dir: &Path) -> MsResult<CommandStatus> {
        self.stream(dir, ["fetch", self.remote.as_str()])
    }

    pub fn pull(&self, dir: &Path) -> MsResult<CommandStatus> {
        self.stream(dir, ["pull"])
    }

    /// `git checkout <branch>`, captured so the caller can word the result.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn checkout(&self, dir: &Path, branch: &str) -> MsResult<CommandOutput> {
        self.capture(dir, ["checkout", branch])
    }

    pub fn create_branch(&self, dir: &Path, branch: &str) -> MsResult<CommandOutput> {
        self.capture(dir, ["checkout", "-b", branch])
    }

    pub fn push_upstream(&self, dir: &Path, branch: &str) -> MsResult<CommandStatus> {
        self.stream(dir, ["push", "-u", self.remote.as_str(), branch])
    }

    /// `git branch -a` with the pager disabled.
    pub fn branches(&self, dir: &Path) -> MsResult<CommandStatus> {
        self.runner
            .stream(&Self::git(dir, ["branch", "-a"]).env("GIT_PAGER", "cat"))
    }

    /// Stage everything, then return `diff --cached --name-status` lines.
    pub fn add_all(&self, dir: &Path) -> MsResult<Vec<String>> {
        self.capture_ok(dir, ["add", "."])?;
        let staged = self
            .capture(dir, ["diff", "--cached", "--name-status"])?;
        if !staged.success() {
            return Ok(Vec::new());
        }
        Ok(staged
            .stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_owned)
            .collect())
    }

    pub fn commit(&self, dir: &Path, message: &str) -> MsResult<CommandStatus> {
        self.stream(dir, ["commit", "-m", message])
    }

    /// Work out the push command. Force-pushing the default branch is
    /// refused; a branch without upstream gets `-u <branch>`.
    pub fn plan_push(&self, dir: &Path, force: bool, default_branch: &str) -> MsResult<PushPlan> {
        let branch = self.current_branch(dir);
        if force && branch == default_branch {
            return Err(DomainError::ForcePushToDefault { branch }.into());
        }

        let upstream = self.capture(
            dir,
            ["rev-parse".to_string(), "--abbrev-ref".into(), format!("{branch}@{{upstream}}")],
        )?;
        let set_upstream = !upstream.success();

        let mut spec = Self::git(dir, ["push", self.remote.as_str()]);
        if force {
            spec = spec.arg("--force");
        }
        if set_upstream {
            spec = spec.args(["-u", branch.as_str()]);
        }
        Ok(PushPlan {
            branch,
            set_upstream,
            spec,
        })
    }

    pub fn push(&self, plan: &PushPlan) -> MsResult<CommandStatus> {
        self.runner.stream(&plan.spec)
    }

    /// Fetch with prune and return local branches that no longer exist on
    /// the remote, excluding the checked-out one.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn stale_branches(&self, dir: &Path) -> MsResult<Vec<String>> {
        let fetched = self.capture(dir, ["fetch", "--prune"])?;
        if !fetched.success() {
            warn!(stderr = %fetched.stderr.trim(), "fetch --prune failed");
        }
        let local = self.capture_ok(dir, ["for-each-ref", "--format=%(refname:short)", "refs/heads"])?;
        let remote = self.capture_ok(
            dir,
            [
                "for-each-ref".to_string(),
                "--format=%(refname:short)".into(),
                format!("refs/remotes/{}", self.remote),
            ],
        )?;
        let current = self.current_branch(dir);
        let stale = git::stale_branches(&local, &remote, &current, &self.remote);
        debug!(count = stale.len(), "Stale branches");
        Ok(stale)
    }

    pub fn delete_branch(&self, dir: &Path, branch: &str) -> MsResult<CommandOutput> {
        self.capture(dir, ["branch", "-D", branch])
    }

    /// Fetch, hard-reset to `<remote>/<branch>`, and return the resulting
    /// `status -sb` output.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn reset_hard(&self, dir: &Path, branch: &str) -> MsResult<ResetReport> {
        let fetched = self.fetch(dir)?;
        if !fetched.success() {
            return Err(ApplicationError::command_failed(
                format!("git fetch {}", self.remote),
                fetched.0,
                "Git fetch failed",
            )
            .into());
        }
        let target = format!("{}/{branch}", self.remote);
        self.capture_ok(dir, ["reset", "--hard", target.as_str()])?;
        let status = self
            .capture(dir, ["status", "-sb"])
            .map(|o| o.stdout)
            .unwrap_or_default();
        Ok(ResetReport { target, status })
    }

    /// Run `git <args>` with the terminal attached.
    pub fn passthrough(&self, dir: &Path, args: &[String]) -> MsResult<CommandStatus> {
        self.stream(dir, args.iter().cloned())
    }

    pub fn diff(&self, dir: &Path, args: &[String]) -> MsResult<CommandStatus> {
        self.stream(dir, std::iter::once("diff".to_string()).chain(args.iter().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockCommandRunner;
    use crate::error::MsError;

    fn has_args(spec: &CommandSpec, args: &[&str]) -> bool {
        spec.program == "git" && spec.args == args
    }

    fn service(runner: MockCommandRunner) -> GitService {
        GitService::new(Arc::new(runner), "origin")
    }

    #[test]
    fn reset_reports_target_before_status() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_stream()
            .withf(|s| has_args(s, &["fetch", "origin"]))
            .returning(|_| Ok(CommandStatus::SUCCESS));
        runner
            .expect_capture()
            .withf(|s| has_args(s, &["reset", "--hard", "origin/main"]))
            .returning(|_| Ok(CommandOutput::ok("HEAD is now at abc123 init\n")));
        runner
            .expect_capture()
            .withf(|s| has_args(s, &["status", "-sb"]))
            .returning(|_| Ok(CommandOutput::ok("## main...origin/main\n")));

        let report = service(runner).reset_hard(Path::new("/w/a"), "main").unwrap();
        assert_eq!(report.target, "origin/main");
        assert_eq!(
            report.lines().collect::<Vec<_>>(),
            ["Reset hard to origin/main", "## main...origin/main"]
        );
    }

    #[test]
    fn current_branch_falls_back_to_unknown() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_capture()
            .returning(|_| Ok(CommandOutput::failed(128, "not a git repository")));
        assert_eq!(service(runner).current_branch(Path::new("/w/a")), "unknown");
    }

    #[test]
    fn status_splits_tracking_line() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_capture()
            .withf(|s| has_args(s, &["rev-parse", "--abbrev-ref", "HEAD"]))
            .returning(|_| Ok(CommandOutput::ok("main\n")));
        runner
            .expect_capture()
            .withf(|s| has_args(s, &["status", "-sb"]))
            .returning(|_| Ok(CommandOutput::ok("## main...origin/main [behind 3]\n M a.rs\n")));

        let status = service(runner).status(Path::new("/w/a")).unwrap();
        assert_eq!(status.branch, "main");
        assert_eq!(status.tracking.as_deref(), Some("[behind 3]"));
        assert_eq!(status.changes, [" M a.rs"]);
    }

    #[test]
    fn force_push_to_default_is_refused() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_capture()
            .returning(|_| Ok(CommandOutput::ok("main\n")));
        runner.expect_stream().never();

        let err = service(runner)
            .plan_push(Path::new("/w/a"), true, "main")
            .unwrap_err();
        assert!(matches!(
            err,
            MsError::Domain(DomainError::ForcePushToDefault { .. })
        ));
    }

    #[test]
    fn push_without_upstream_sets_it() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_capture()
            .withf(|s| has_args(s, &["rev-parse", "--abbrev-ref", "HEAD"]))
            .returning(|_| Ok(CommandOutput::ok("feat/x\n")));
        runner
            .expect_capture()
            .withf(|s| has_args(s, &["rev-parse", "--abbrev-ref", "feat/x@{upstream}"]))
            .returning(|_| Ok(CommandOutput::failed(128, "no upstream")));
        runner
            .expect_stream()
            .withf(|s| has_args(s, &["push", "origin", "-u", "feat/x"]))
            .times(1)
            .returning(|_| Ok(CommandStatus::SUCCESS));

        let git = service(runner);
        let plan = git.plan_push(Path::new("/w/a"), false, "main").unwrap();
        assert!(plan.set_upstream);
        assert!(git.push(&plan).unwrap().success());
    }

    #[test]
    fn completion_swallows_git_errors() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_capture()
            .returning(|_| Ok(CommandOutput::failed(128, "fatal")));
        let git = service(runner);
        assert!(git.complete_branches(Path::new("/tmp"), "", false).is_empty());
        assert!(git.changed_files(Path::new("/tmp")).is_empty());
    }

    #[test]
    fn prompt_info_outside_repo_is_none() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_capture()
            .returning(|_| Ok(CommandOutput::failed(128, "not a git repository")));
        assert!(service(runner).prompt_info(Path::new("/tmp")).is_none());
    }

    #[test]
    fn branches_disable_pager() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_stream()
            .withf(|s| s.env.iter().any(|(k, v)| k == "GIT_PAGER" && v == "cat"))
            .returning(|_| Ok(CommandStatus::SUCCESS));
        assert!(service(runner).branches(Path::new("/w/a")).unwrap().success());
    }
}
