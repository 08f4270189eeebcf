//! Parsers for git and GitHub CLI text output.
//!
//! Every function here tolerates empty output: an empty `stdout` yields an
//! empty list or `None`, never an error.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::domain::error::DomainError;

static TRACKING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]").expect("valid tracking regex"));

/// Branch name used when `rev-parse` fails.
pub const UNKNOWN_BRANCH: &str = "unknown";

/// Split `git status -sb` output into the ahead/behind marker of the
/// branch line (e.g. `[ahead 1]`) and the remaining change lines.
pub fn split_status(stdout: &str) -> (Option<String>, Vec<&str>) {
    let mut lines = stdout.lines();
    let tracking = lines
        .next()
        .and_then(|first| TRACKING_RE.captures(first))
        .map(|c| format!("[{}]", &c[1]));
    (tracking, lines.collect())
}

/// Non-empty trimmed lines, order kept, duplicates dropped.
pub fn unique_lines(stdout: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| seen.insert(*l))
        .map(str::to_owned)
        .collect()
}

/// Local branch names from `git branch --format=%(refname:short)`,
/// restricted to those starting with `prefix`.
pub fn complete_branches(stdout: &str, prefix: &str) -> Vec<String> {
    unique_lines(stdout)
        .into_iter()
        .filter(|b| b.starts_with(prefix))
        .collect()
}

/// Remote branch names for `remote`, with `<remote>/` stripped and the
/// symbolic `HEAD` removed.
pub fn complete_remote_branches(stdout: &str, remote: &str, prefix: &str) -> Vec<String> {
    let strip = format!("{remote}/");
    unique_lines(stdout)
        .iter()
        .filter_map(|b| b.strip_prefix(&strip))
        .filter(|b| *b != "HEAD" && !b.is_empty() && b.starts_with(prefix))
        .map(str::to_owned)
        .collect()
}

/// Concatenate file lists, first occurrence wins.
pub fn merge_file_lists(lists: &[&str]) -> Vec<String> {
    unique_lines(&lists.join("\n"))
}

/// Local branches with no counterpart on `remote` that can be deleted.
///
/// `local` is `for-each-ref refs/heads` output, `remote_refs` is
/// `for-each-ref refs/remotes/<remote>` output.
pub fn stale_branches(local: &str, remote_refs: &str, current: &str, remote: &str) -> Vec<String> {
    let strip = format!("{remote}/");
    let on_remote: HashSet<&str> = remote_refs
        .lines()
        .map(str::trim)
        .filter_map(|r| r.strip_prefix(&strip))
        .collect();
    let mut stale: Vec<String> = unique_lines(local)
        .into_iter()
        .filter(|b| b != current && b != "HEAD" && !on_remote.contains(b.as_str()))
        .collect();
    stale.sort();
    stale
}

/// Browser URL of a GitHub remote.
///
/// `git@github.com:owner/repo.git` becomes `https://github.com/owner/repo`.
pub fn github_web_url(remote_url: &str) -> String {
    let url = remote_url.trim();
    let url = match url.strip_prefix("git@github.com:") {
        Some(path) => format!("https://github.com/{path}"),
        None => url.to_owned(),
    };
    url.strip_suffix(".git").map(str::to_owned).unwrap_or(url)
}

pub fn last_line(stdout: &str) -> Option<&str> {
    stdout.trim().lines().last()
}

/// `(ahead, behind)` from `git rev-list --left-right --count HEAD...@{upstream}`.
pub fn parse_ahead_behind(stdout: &str) -> Option<(u32, u32)> {
    let mut parts = stdout.split_whitespace();
    let ahead = parts.next()?.parse().ok()?;
    let behind = parts.next()?.parse().ok()?;
    Some((ahead, behind))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub head_ref_name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub url: String,
}

/// Parse `gh pr list --json number,title,headRefName,state,url`.
pub fn parse_pr_list(stdout: &str) -> Result<Vec<PullRequest>, DomainError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).map_err(|e| DomainError::UnparsableOutput {
        what: "PR list",
        reason: e.to_string(),
    })
}
