//! GitHub CLI (`gh`) wrappers for pull requests.

use std::path::Path;
use std::sync::Arc;

use tracing::instrument;

use crate::{
    application::{
        ApplicationError,
        ports::{CommandOutput, CommandRunner, CommandSpec},
    },
    domain::{PullRequest, git},
    error::MsResult,
};

const GH: &str = "gh";
const PR_LIST_FIELDS: &str = "number,title,headRefName,state,url";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrCreated {
    Created { url: String },
    AlreadyExists,
}

/// Options for `gh pr create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest<'a> {
    pub head: &'a str,
    pub base: &'a str,
    pub title: &'a str,
    pub draft: bool,
}

pub struct GithubService {
    runner: Arc<dyn CommandRunner>,
}

impl GithubService {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub fn ensure_available(&self) -> MsResult<()> {
        if self.runner.is_available(GH) {
            Ok(())
        } else {
            Err(ApplicationError::ToolNotFound {
                tool: GH.into(),
                hint: "GitHub CLI is not installed. Install it: https://cli.github.com/".into(),
            }
            .into())
        }
    }

    #[instrument(skip(self, pr), fields(dir = %dir.display(), head = pr.head))]
    pub fn create(&self, dir: &Path, pr: &NewPullRequest<'_>) -> MsResult<PrCreated> {
        let mut spec = CommandSpec::new(GH)
            .cwd(dir)
            .args(["pr", "create", "--base", pr.base, "--head", pr.head, "--title", pr.title, "--fill"]);
        if pr.draft {
            spec = spec.arg("--draft");
        }

        let out = self.runner.capture(&spec)?;
        if out.success() {
            return Ok(PrCreated::Created {
                url: git::last_line(&out.stdout).unwrap_or_default().to_string(),
            });
        }
        if out.stderr.to_lowercase().contains("already exists") {
            return Ok(PrCreated::AlreadyExists);
        }
        Err(ApplicationError::command_failed(spec.display(), out.status, &out.stderr).into())
    }

    /// Open pull requests. A repository with none yields an empty list.
    pub fn list(&self, dir: &Path) -> MsResult<Vec<PullRequest>> {
        let spec = CommandSpec::new(GH)
            .cwd(dir)
            .args(["pr", "list", "--json", PR_LIST_FIELDS, "--limit", "100"]);
        let out = self.runner.capture(&spec)?;

        if !out.success() {
            let empty = out.stderr.to_lowercase().contains("no pull requests")
                || out.stdout.trim().is_empty()
                || out.stdout.trim() == "[]";
            if empty {
                return Ok(Vec::new());
            }
            return Err(
                ApplicationError::command_failed(spec.display(), out.status, &out.stderr).into(),
            );
        }
        Ok(git::parse_pr_list(&out.stdout)?)
    }

    /// `gh pr checkout <number>`.
    pub fn checkout(&self, dir: &Path, number: u64) -> MsResult<CommandOutput> {
        self.runner.capture(
            &CommandSpec::new(GH)
                .cwd(dir)
                .args(["pr".to_string(), "checkout".into(), number.to_string()]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockCommandRunner;

    fn pr<'a>() -> NewPullRequest<'a> {
        NewPullRequest {
            head: "feat/x",
            base: "main",
            title: "Add x",
            draft: true,
        }
    }

    #[test]
    fn create_reports_url_from_last_line() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_capture()
            .withf(|s| s.args.last().map(String::as_str) == Some("--draft"))
            .returning(|_| Ok(CommandOutput::ok("Creating...\nhttps://github.com/a/b/pull/3\n")));

        let created = GithubService::new(Arc::new(runner))
            .create(Path::new("/w/a"), &pr())
            .unwrap();
        assert_eq!(
            created,
            PrCreated::Created {
                url: "https://github.com/a/b/pull/3".into()
            }
        );
    }

    #[test]
    fn create_detects_existing_pr() {
        let mut runner = MockCommandRunner::new();
        runner.expect_capture().returning(|_| {
            Ok(CommandOutput::failed(
                1,
                "a pull request for branch \"feat/x\" into branch \"main\" already exists",
            ))
        });
        let created = GithubService::new(Arc::new(runner))
            .create(Path::new("/w/a"), &pr())
            .unwrap();
        assert_eq!(created, PrCreated::AlreadyExists);
    }

    #[test]
    fn list_treats_empty_failure_as_no_prs() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_capture()
            .returning(|_| Ok(CommandOutput::failed(1, "no pull requests match your search")));
        let prs = GithubService::new(Arc::new(runner)).list(Path::new("/w/a")).unwrap();
        assert!(prs.is_empty());
    }

    #[test]
    fn missing_gh_is_reported() {
        let mut runner = MockCommandRunner::new();
        runner.expect_is_available().return_const(false);
        let err = GithubService::new(Arc::new(runner))
            .ensure_available()
            .unwrap_err();
        assert!(err.to_string().starts_with("'gh' command not found"));
    }
}
