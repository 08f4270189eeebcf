//! Workspace configuration model (`ms-config.json`).
//!
//! The workspace root is a directory whose immediate children are git
//! repositories. This file only models the JSON document and the rules it
//! must satisfy; loading and saving go through the `ConfigStore` port.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::color::RepoColor;
use crate::domain::error::DomainError;

/// File name of the workspace config, relative to the workspace root.
pub const CONFIG_FILENAME: &str = "ms-config.json";

/// The only schema version this build understands.
pub const SCHEMA_VERSION: u64 = 1;

const DEFAULT_ENV_FILE: &str = ".env";

// ── Top-level document ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    pub schema_version: u64,
    #[serde(default)]
    pub workspace: WorkspaceInfo,
    #[serde(default)]
    pub env: EnvRules,
    #[serde(default)]
    pub repositories: Vec<RepoConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInfo {
    pub name: String,
    pub repo_discovery: String,
}

impl Default for WorkspaceInfo {
    fn default() -> Self {
        Self {
            name: "default".into(),
            repo_discovery: "immediate-children-git-only".into(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            workspace: WorkspaceInfo::default(),
            env: EnvRules::default(),
            repositories: Vec::new(),
        }
    }
}

/// Reject documents whose `schemaVersion` is anything other than `1`.
///
/// Runs on the raw JSON before typed deserialization so that a missing or
/// mistyped version produces the schema message rather than a serde one.
pub fn check_schema_version(raw: &serde_json::Value) -> Result<(), DomainError> {
    match raw.get("schemaVersion") {
        Some(v) if v.as_u64() == Some(SCHEMA_VERSION) => Ok(()),
        Some(v) => Err(DomainError::UnsupportedSchemaVersion {
            found: v.to_string(),
        }),
        None => Err(DomainError::UnsupportedSchemaVersion {
            found: "None".into(),
        }),
    }
}

impl WorkspaceConfig {
    /// Check cross-repository invariants.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut aliases = HashSet::new();
        for repo in &self.repositories {
            if repo.alias.trim().is_empty() {
                return Err(DomainError::EmptyAlias);
            }
            if !aliases.insert(repo.alias.as_str()) {
                return Err(DomainError::DuplicateAlias {
                    alias: repo.alias.clone(),
                });
            }
            repo.validate()?;
        }

        let alembic: Vec<_> = self
            .repositories
            .iter()
            .filter(|r| r.kind == RepoKind::DbAlembic)
            .collect();
        if alembic.len() > 1 {
            return Err(DomainError::MultipleAlembicRepos {
                existing: alembic[0].name.clone(),
            });
        }
        Ok(())
    }

    /// Find a repository by alias, falling back to its directory name.
    pub fn find_repo(&self, selector: &str) -> Option<&RepoConfig> {
        self.repositories
            .iter()
            .find(|r| r.alias == selector)
            .or_else(|| self.repositories.iter().find(|r| r.name == selector))
    }

    fn position(&self, selector: &str) -> Option<usize> {
        self.repositories
            .iter()
            .position(|r| r.alias == selector)
            .or_else(|| self.repositories.iter().position(|r| r.name == selector))
    }

    /// Like [`Self::find_repo`] but returns an error naming the selector.
    pub fn require_repo(&self, selector: &str) -> Result<&RepoConfig, DomainError> {
        self.find_repo(selector)
            .ok_or_else(|| DomainError::UnknownRepo {
                selector: selector.into(),
            })
    }

    /// Resolve `--repo` selectors. An empty selector list means "all repos".
    /// Duplicates collapse and config order is kept.
    pub fn select(&self, selectors: &[String]) -> Result<Vec<&RepoConfig>, DomainError> {
        if selectors.is_empty() {
            return Ok(self.repositories.iter().collect());
        }
        let mut wanted = HashSet::new();
        for s in selectors {
            let idx = self.position(s).ok_or_else(|| DomainError::UnknownRepo {
                selector: s.clone(),
            })?;
            wanted.insert(idx);
        }
        Ok(self
            .repositories
            .iter()
            .enumerate()
            .filter(|(i, _)| wanted.contains(i))
            .map(|(_, r)| r)
            .collect())
    }

    /// The single `db-alembic` repository, if any.
    pub fn alembic_repo(&self) -> Option<&RepoConfig> {
        self.repositories
            .iter()
            .find(|r| r.kind == RepoKind::DbAlembic)
    }

    pub fn alias_in_use(&self, alias: &str) -> bool {
        self.repositories.iter().any(|r| r.alias == alias)
    }

    /// Append a repository after checking every invariant against the
    /// existing set.
    pub fn add_repo(&mut self, repo: RepoConfig) -> Result<(), DomainError> {
        if self.repositories.iter().any(|r| r.name == repo.name) {
            return Err(DomainError::DuplicateRepo { name: repo.name });
        }
        if repo.alias.trim().is_empty() {
            return Err(DomainError::EmptyAlias);
        }
        if self.alias_in_use(&repo.alias) {
            return Err(DomainError::DuplicateAlias { alias: repo.alias });
        }
        if repo.kind == RepoKind::DbAlembic {
            if let Some(existing) = self.alembic_repo() {
                return Err(DomainError::MultipleAlembicRepos {
                    existing: existing.name.clone(),
                });
            }
        }
        repo.validate()?;
        self.repositories.push(repo);
        Ok(())
    }

    /// Change the alias of the repository at `index`.
    pub fn set_alias(&mut self, index: usize, alias: &str) -> Result<(), DomainError> {
        if alias.trim().is_empty() {
            return Err(DomainError::EmptyAlias);
        }
        let taken = self
            .repositories
            .iter()
            .enumerate()
            .any(|(i, r)| i != index && r.alias == alias);
        if taken {
            return Err(DomainError::DuplicateAlias {
                alias: alias.into(),
            });
        }
        if let Some(repo) = self.repositories.get_mut(index) {
            repo.alias = alias.into();
        }
        Ok(())
    }

    pub fn remove_repo(&mut self, index: usize) -> Option<RepoConfig> {
        (index < self.repositories.len()).then(|| self.repositories.remove(index))
    }

    /// Lines for `eval "$(ms aliases)"`.
    pub fn alias_lines(&self) -> Vec<String> {
        self.repositories
            .iter()
            .map(|r| format!("alias {0}='ms {0}'", r.alias))
            .collect()
    }
}

// ── Repositories ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepoKind {
    #[default]
    App,
    DbAlembic,
}

impl RepoKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::App => "app",
            Self::DbAlembic => "db-alembic",
        }
    }
}

impl fmt::Display for RepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "app" => Ok(Self::App),
            "db-alembic" => Ok(Self::DbAlembic),
            other => Err(DomainError::InvalidRepoKind {
                value: other.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlembicSettings {
    pub revisions_directory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoConfig {
    /// Directory name under the workspace root.
    pub name: String,
    pub alias: String,
    #[serde(rename = "type", default)]
    pub kind: RepoKind,
    #[serde(default = "default_env_file")]
    pub env_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alembic: Option<AlembicSettings>,
    #[serde(default)]
    pub color: RepoColor,
}

fn default_env_file() -> String {
    DEFAULT_ENV_FILE.into()
}

impl RepoConfig {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            kind: RepoKind::App,
            env_file: default_env_file(),
            alembic: None,
            color: RepoColor::default(),
        }
    }

    #[must_use]
    pub fn with_alembic(mut self, revisions_directory: impl Into<String>) -> Self {
        self.kind = RepoKind::DbAlembic;
        self.alembic = Some(AlembicSettings {
            revisions_directory: revisions_directory.into(),
        });
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: RepoColor) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_env_file(mut self, env_file: impl Into<String>) -> Self {
        self.env_file = env_file.into();
        self
    }

    pub fn revisions_directory(&self) -> Option<&str> {
        self.alembic
            .as_ref()
            .map(|a| a.revisions_directory.as_str())
            .filter(|d| !d.trim().is_empty())
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.kind == RepoKind::DbAlembic && self.revisions_directory().is_none() {
            return Err(DomainError::MissingRevisionsDirectory {
                repo: self.name.clone(),
            });
        }
        Ok(())
    }
}

// ── Env rules ─────────────────────────────────────────────────────────────────

/// Whether env conflicts fail the command or only print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvMode {
    #[default]
    Strict,
    Warn,
}

/// What `env ls` does when a repo's env file does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingEnvPolicy {
    Strict,
    #[default]
    Warn,
    Ignore,
}

impl fmt::Display for EnvMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Warn => "warn",
        })
    }
}

impl FromStr for EnvMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "warn" => Ok(Self::Warn),
            other => Err(DomainError::InvalidSetting {
                field: "env mode",
                value: other.into(),
            }),
        }
    }
}

impl fmt::Display for MissingEnvPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Warn => "warn",
            Self::Ignore => "ignore",
        })
    }
}

impl FromStr for MissingEnvPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "warn" => Ok(Self::Warn),
            "ignore" => Ok(Self::Ignore),
            other => Err(DomainError::InvalidSetting {
                field: "missing env file behavior",
                value: other.into(),
            }),
        }
    }
}

/// A set of differently-named keys that must hold the same value,
/// e.g. `DB_HOST` in one repo and `SQL_SERVER` in another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchGroup {
    pub name: String,
    #[serde(default)]
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvRules {
    #[serde(default)]
    pub mode: EnvMode,
    #[serde(default)]
    pub missing_env_file: MissingEnvPolicy,
    #[serde(default)]
    pub ignore_keys: Vec<String>,
    #[serde(default)]
    pub match_groups: Vec<MatchGroup>,
}

impl EnvRules {
    pub fn is_ignored(&self, key: &str) -> bool {
        self.ignore_keys.iter().any(|k| k == key)
    }

    pub fn group_for(&self, key: &str) -> Option<&MatchGroup> {
        self.match_groups
            .iter()
            .find(|g| g.keys.iter().any(|k| k == key))
    }

    /// Returns `false` when the key is empty or already ignored.
    pub fn add_ignore_key(&mut self, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() || self.is_ignored(key) {
            return false;
        }
        self.ignore_keys.push(key.into());
        true
    }

    pub fn remove_ignore_key(&mut self, index: usize) -> Option<String> {
        (index < self.ignore_keys.len()).then(|| self.ignore_keys.remove(index))
    }

    /// Add a group from a name and a comma-separated key list.
    pub fn add_match_group(&mut self, name: &str, keys_input: &str) -> Result<(), DomainError> {
        let name = name.trim();
        let keys = parse_key_list(keys_input);
        if name.is_empty() || keys.is_empty() {
            return Err(DomainError::InvalidSetting {
                field: "match group",
                value: format!("{name} [{keys_input}]"),
            });
        }
        self.match_groups.push(MatchGroup {
            name: name.into(),
            keys,
        });
        Ok(())
    }

    pub fn remove_match_group(&mut self, index: usize) -> Option<MatchGroup> {
        (index < self.match_groups.len()).then(|| self.match_groups.remove(index))
    }
}

/// Split `DB_HOST, "SQL_SERVER" ,'X'` into bare keys.
pub fn parse_key_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|k| crate::domain::env::strip_quotes(k.trim()))
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect()
}
