//! Alembic revision graph and branch-switch migration planning.
//!
//! Revisions are read from git trees rather than the working copy, so the
//! chain of the branch being switched *to* is known before checkout.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static MISSING_REVISION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Can't locate revision identified by '([a-zA-Z0-9]+)'")
        .expect("valid missing revision regex")
});

const MIN_REVISION_LEN: usize = 12;

/// One revision file as found in a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub id: String,
    pub down_revision: Option<String>,
    /// Path relative to the repository root.
    pub file: String,
}

impl Revision {
    pub fn new(id: impl Into<String>, down_revision: Option<&str>) -> Self {
        Self {
            id: id.into(),
            down_revision: down_revision.map(str::to_owned),
            file: String::new(),
        }
    }
}

fn assigned_value(line: &str) -> Option<&str> {
    let (_, value) = line.split_once('=')?;
    Some(value.trim().trim_matches(|c| c == '\'' || c == '"'))
}

/// Extract `revision` / `down_revision` from a revision module.
///
/// Both `revision = 'abc'` and `revision: str = "abc"` are accepted.
/// Returns `None` when the file declares no revision id.
pub fn parse_revision_file(content: &str, file: impl Into<String>) -> Option<Revision> {
    let mut id = None;
    let mut down = None;

    for line in content.lines().map(str::trim) {
        if line.starts_with("revision:") || line.starts_with("revision =") {
            id = assigned_value(line).map(str::to_owned);
        } else if line.starts_with("down_revision:") || line.starts_with("down_revision =") {
            down = assigned_value(line)
                .filter(|v| *v != "None")
                .map(str::to_owned);
        }
    }

    id.filter(|i| !i.is_empty()).map(|id| Revision {
        id,
        down_revision: down,
        file: file.into(),
    })
}

/// Revision modules from `git ls-tree --name-only` output.
pub fn revision_files(ls_tree: &str) -> Vec<&str> {
    ls_tree
        .lines()
        .map(str::trim)
        .filter(|f| f.ends_with(".py") && !f.ends_with("__init__.py"))
        .collect()
}

/// Order revisions base to head.
///
/// The head is the first revision no other revision points to. The walk
/// back along `down_revision` stops at a missing parent or a cycle.
pub fn build_chain(revisions: &[Revision]) -> Vec<String> {
    let Some(first) = revisions.first() else {
        return Vec::new();
    };
    let parents: HashSet<&str> = revisions
        .iter()
        .filter_map(|r| r.down_revision.as_deref())
        .collect();
    let head = revisions
        .iter()
        .find(|r| !parents.contains(r.id.as_str()))
        .unwrap_or(first);

    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some(head);
    while let Some(rev) = current {
        if !seen.insert(rev.id.as_str()) {
            break;
        }
        chain.push(rev.id.clone());
        current = rev
            .down_revision
            .as_deref()
            .and_then(|d| revisions.iter().find(|r| r.id == d));
    }
    chain.reverse();
    chain
}

/// Last revision of the current chain that also exists in the target chain.
pub fn common_revision(current: &[Revision], target: &[Revision]) -> Option<String> {
    let target_chain = build_chain(target);
    build_chain(current)
        .into_iter()
        .filter(|id| target_chain.contains(id))
        .last()
}

/// Revision id from `alembic current` stdout.
pub fn parse_current_revision(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .filter(|l| !l.is_empty() && !l.starts_with("INFO"))
        .flat_map(str::split_whitespace)
        .find(|t| t.len() >= MIN_REVISION_LEN && t.chars().all(char::is_alphanumeric))
        .map(str::to_owned)
}

/// Revision id from a failing `alembic current`, when the database points
/// at a revision the working tree does not have.
pub fn parse_missing_revision(stderr: &str) -> Option<String> {
    MISSING_REVISION_RE
        .captures(stderr)
        .map(|c| c[1].to_owned())
}

/// What has to happen to the database for a branch switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSteps {
    pub current_db_revision: String,
    pub common_revision: Option<String>,
    pub target_head: Option<String>,
    pub needs_downgrade: bool,
    pub needs_upgrade: bool,
}

impl MigrationSteps {
    /// Revision to downgrade to before leaving the current branch.
    pub fn downgrade_target(&self) -> Option<&str> {
        self.common_revision
            .as_deref()
            .filter(|_| self.needs_downgrade)
    }

    pub fn is_noop(&self) -> bool {
        !self.needs_downgrade && !self.needs_upgrade
    }
}

impl fmt::Display for MigrationSteps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_none = |r: &Option<String>| r.clone().unwrap_or_else(|| "none".into());
        writeln!(f, "Current DB revision: {}", self.current_db_revision)?;
        writeln!(f, "Common revision:     {}", or_none(&self.common_revision))?;
        writeln!(f, "Target head:         {}", or_none(&self.target_head))?;
        match self.downgrade_target() {
            Some(rev) => writeln!(f, "Downgrade:           to {rev}")?,
            None => writeln!(f, "Downgrade:           not needed")?,
        }
        write!(
            f,
            "Upgrade:             {}",
            if self.needs_upgrade { "to head" } else { "not needed" }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationPlan {
    /// Neither branch has revisions.
    NotNeeded,
    Steps(MigrationSteps),
    /// The database sits on a revision neither branch knows about.
    Unreachable { revision: String },
}

/// Plan the database moves for switching from `current` to `target`.
pub fn plan(db_revision: &str, current: &[Revision], target: &[Revision]) -> MigrationPlan {
    if current.is_empty() && target.is_empty() {
        return MigrationPlan::NotNeeded;
    }

    let target_chain = build_chain(target);
    let target_head = target_chain.last().cloned();
    let needs_upgrade = target_head.as_deref().is_some_and(|h| h != db_revision);

    let in_current = current.iter().any(|r| r.id == db_revision);
    if !in_current {
        if target.iter().any(|r| r.id == db_revision) {
            return MigrationPlan::Steps(MigrationSteps {
                current_db_revision: db_revision.into(),
                common_revision: None,
                target_head,
                needs_downgrade: false,
                needs_upgrade,
            });
        }
        return MigrationPlan::Unreachable {
            revision: db_revision.into(),
        };
    }

    let common = common_revision(current, target);
    let current_chain = build_chain(current);
    let needs_downgrade = match common.as_deref() {
        Some(c) if c != db_revision => {
            let pos = |id: &str| current_chain.iter().position(|r| r == id);
            match (pos(c), pos(db_revision)) {
                (Some(ci), Some(di)) => di > ci,
                _ => true,
            }
        }
        _ => false,
    };

    MigrationPlan::Steps(MigrationSteps {
        current_db_revision: db_revision.into(),
        common_revision: common,
        target_head,
        needs_downgrade,
        needs_upgrade,
    })
}
