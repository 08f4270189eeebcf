//! `.env` file parsing, in-place key updates and cross-repo consistency.
//!
//! Values are kept raw (quotes included) everywhere except comparison,
//! which goes through [`normalize_value`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::DomainError;
use crate::domain::workspace::{EnvMode, EnvRules};

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*([A-Za-z_][A-Za-z0-9_]*)=(.*)$").expect("valid env line regex")
});

/// Parsed env file: key to raw value, sorted by key.
pub type EnvMap = BTreeMap<String, String>;

fn line_body(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Parse `KEY=VALUE` lines. Anything else is ignored; a later duplicate wins.
pub fn parse(content: &str) -> EnvMap {
    content
        .lines()
        .filter_map(|line| LINE_RE.captures(line_body(line)))
        .map(|c| (c[1].to_owned(), c[2].to_owned()))
        .collect()
}

/// Strip one pair of matching surrounding `"` or `'`. A lone quote
/// character strips to the empty string.
pub fn strip_quotes(value: &str) -> &str {
    match quote_char(value) {
        Some(_) if value.len() < 2 => "",
        Some(_) => &value[1..value.len() - 1],
        None => value,
    }
}

fn quote_char(value: &str) -> Option<char> {
    ['"', '\'']
        .into_iter()
        .find(|q| value.starts_with(*q) && value.ends_with(*q))
}

/// Comparison form of a value: trimmed, then unquoted.
pub fn normalize_value(value: &str) -> String {
    strip_quotes(value.trim()).to_owned()
}

pub fn validate_key(key: &str) -> Result<(), DomainError> {
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DomainError::InvalidEnvKey { key: key.into() });
    }
    Ok(())
}

/// Set `key` to `value` in `content`.
///
/// Returns `None` when the existing value already normalizes to the new
/// one. A rewritten line keeps its leading indentation and line ending and, when the old
/// value was quoted, the quote style.
pub fn update_key(content: &str, key: &str, value: &str) -> Option<String> {
    let mut out = String::with_capacity(content.len() + key.len() + value.len() + 2);
    let mut found = false;
    let mut changed = false;

    for line in content.split_inclusive('\n') {
        let Some(caps) = LINE_RE.captures(line_body(line)) else {
            out.push_str(line);
            continue;
        };
        if &caps[1] != key {
            out.push_str(line);
            continue;
        }

        found = true;
        let old = &caps[2];
        if normalize_value(old) == normalize_value(value) {
            out.push_str(line);
            continue;
        }

        changed = true;
        let indent = &line[..caps.get(1).map_or(0, |m| m.start())];
        let new_value = match quote_char(old.trim()) {
            Some(q) if !(value.starts_with(q) && value.ends_with(q)) => format!("{q}{value}{q}"),
            _ => value.to_owned(),
        };
        let ending = if line.ends_with("\r\n") { "\r\n" } else { "\n" };
        out.push_str(&format!("{indent}{key}={new_value}{ending}"));
    }

    if !found {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("{key}={value}\n"));
        changed = true;
    }

    changed.then_some(out)
}

// ── Conflict detection ────────────────────────────────────────────────────────

/// One repository's parsed env file, in config order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEnv {
    pub repo: String,
    pub vars: EnvMap,
}

impl RepoEnv {
    pub fn new(repo: impl Into<String>, vars: EnvMap) -> Self {
        Self {
            repo: repo.into(),
            vars,
        }
    }

    fn normalized(&self, key: &str) -> Option<String> {
        self.vars.get(key).map(|v| normalize_value(v))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvConflict {
    /// The same key holds different values in two repos.
    Key {
        key: String,
        first_repo: String,
        first_value: String,
        repo: String,
        value: String,
    },
    /// Two keys of one match group disagree inside a single repo.
    GroupInternal {
        group: String,
        repo: String,
        first_key: String,
        first_value: String,
        key: String,
        value: String,
    },
    /// A match group resolves to different values in two repos.
    GroupCross {
        group: String,
        first_repo: String,
        first_key: String,
        first_value: String,
        repo: String,
        key: String,
        value: String,
    },
}

impl fmt::Display for EnvConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key {
                key,
                first_repo,
                first_value,
                repo,
                value,
            } => write!(
                f,
                "Conflict for key '{key}': {first_repo}={first_value} vs {repo}={value}"
            ),
            Self::GroupInternal {
                group,
                repo,
                first_key,
                first_value,
                key,
                value,
            } => write!(
                f,
                "Internal conflict in '{repo}' for group '{group}': {first_key}={first_value} vs {key}={value}"
            ),
            Self::GroupCross {
                group,
                first_repo,
                first_key,
                first_value,
                repo,
                key,
                value,
            } => write!(
                f,
                "Group '{group}' conflict: {first_repo}.{first_key}={first_value} vs {repo}.{key}={value}"
            ),
        }
    }
}

/// Check every rule over `envs`. Missing env files should be passed as
/// empty maps.
pub fn find_conflicts(rules: &EnvRules, envs: &[RepoEnv]) -> Vec<EnvConflict> {
    let mut conflicts = Vec::new();

    // Assumed matching: same key name, same value.
    let keys: BTreeSet<&str> = envs
        .iter()
        .flat_map(|e| e.vars.keys().map(String::as_str))
        .filter(|k| !rules.is_ignored(k))
        .collect();

    for key in keys {
        let holders: Vec<_> = envs
            .iter()
            .filter_map(|e| e.normalized(key).map(|v| (e, v)))
            .collect();
        let [(first, first_value), rest @ ..] = holders.as_slice() else {
            continue;
        };
        for (env, value) in rest {
            if value != first_value {
                conflicts.push(EnvConflict::Key {
                    key: key.into(),
                    first_repo: first.repo.clone(),
                    first_value: first_value.clone(),
                    repo: env.repo.clone(),
                    value: value.clone(),
                });
            }
        }
    }

    // Explicit match groups.
    for group in &rules.match_groups {
        let mut anchor: Option<(&str, &str, String)> = None;

        for env in envs {
            let present: Vec<(&str, String)> = env
                .vars
                .keys()
                .filter(|k| group.keys.contains(*k))
                .filter_map(|k| env.normalized(k).map(|v| (k.as_str(), v)))
                .collect();
            let [(first_key, first_value), rest @ ..] = present.as_slice() else {
                continue;
            };

            for (key, value) in rest {
                if value != first_value {
                    conflicts.push(EnvConflict::GroupInternal {
                        group: group.name.clone(),
                        repo: env.repo.clone(),
                        first_key: (*first_key).into(),
                        first_value: first_value.clone(),
                        key: (*key).into(),
                        value: value.clone(),
                    });
                }
            }

            match &anchor {
                None => anchor = Some((env.repo.as_str(), *first_key, first_value.clone())),
                Some((repo, key, value)) if value != first_value => {
                    conflicts.push(EnvConflict::GroupCross {
                        group: group.name.clone(),
                        first_repo: (*repo).into(),
                        first_key: (*key).into(),
                        first_value: value.clone(),
                        repo: env.repo.clone(),
                        key: (*first_key).into(),
                        value: first_value.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    conflicts
}

/// Turn conflicts into a failure under strict mode.
pub fn enforce(mode: EnvMode, conflicts: &[EnvConflict]) -> Result<(), DomainError> {
    match mode {
        EnvMode::Strict if !conflicts.is_empty() => Err(DomainError::EnvConflicts {
            count: conflicts.len(),
        }),
        _ => Ok(()),
    }
}

// ── Related keys ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSource {
    Group(String),
    Assumed,
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group(name) => write!(f, "group:{name}"),
            Self::Assumed => f.write_str("assumed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMatch {
    pub repo: String,
    pub key: String,
    pub value: String,
    pub source: MatchSource,
}

/// Keys in `envs` that are expected to hold the same value as `target`.
///
/// A key in a match group is looked up through the group's keys; any other
/// key only matches itself. Ignored keys match nothing.
pub fn find_matching_keys(rules: &EnvRules, envs: &[RepoEnv], target: &str) -> Vec<KeyMatch> {
    if rules.is_ignored(target) {
        return Vec::new();
    }
    let group = rules.group_for(target);

    envs.iter()
        .filter_map(|env| {
            let (key, source) = match group {
                Some(g) => (
                    g.keys.iter().find(|k| env.vars.contains_key(*k))?.as_str(),
                    MatchSource::Group(g.name.clone()),
                ),
                None => (target, MatchSource::Assumed),
            };
            let value = env.vars.get(key)?;
            Some(KeyMatch {
                repo: env.repo.clone(),
                key: key.into(),
                value: value.clone(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workspace::MatchGroup;

    fn env(repo: &str, pairs: &[(&str, &str)]) -> RepoEnv {
        RepoEnv::new(
            repo,
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        )
    }

    fn sql_rules() -> EnvRules {
        EnvRules {
            match_groups: vec![MatchGroup {
                name: "sql".into(),
                keys: vec!["DB_HOST".into(), "SQL_SERVER".into()],
            }],
            ..EnvRules::default()
        }
    }

    #[test]
    fn parse_ignores_comments_and_keeps_raw_values() {
        let vars = parse("# comment\n  PORT=8080\nNAME=\"app\"\nnot a line\nPORT=9090\n");
        assert_eq!(vars.get("PORT").map(String::as_str), Some("9090"));
        assert_eq!(vars.get("NAME").map(String::as_str), Some("\"app\""));
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn parse_handles_crlf() {
        let vars = parse("A=1\r\nB=2\r\n");
        assert_eq!(vars["A"], "1");
        assert_eq!(vars["B"], "2");
    }

    #[test]
    fn normalize_trims_then_unquotes_once() {
        assert_eq!(normalize_value("  \"x\"  "), "x");
        assert_eq!(normalize_value("'y'"), "y");
        assert_eq!(normalize_value("\"'z'\""), "'z'");
        assert_eq!(normalize_value("\"mismatch'"), "\"mismatch'");
        assert_eq!(normalize_value("\""), "");
        assert_eq!(normalize_value(" ' "), "");
    }

    #[test]
    fn key_validation() {
        assert!(validate_key("DATABASE_URL").is_ok());
        assert!(validate_key("lower_ok_1").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("BAD-KEY").is_err());
    }

    #[test]
    fn update_same_normalized_value_is_noop() {
        assert_eq!(update_key("A=\"1\"\n", "A", "1"), None);
    }

    #[test]
    fn update_keeps_indent_and_quotes() {
        let out = update_key("# top\n  A=\"old\"\nB=2\n", "A", "new").unwrap();
        assert_eq!(out, "# top\n  A=\"new\"\nB=2\n");
    }

    #[test]
    fn update_keeps_crlf_line_endings() {
        let out = update_key("A=old\r\nB=1\r\n", "A", "new").unwrap();
        assert_eq!(out, "A=new\r\nB=1\r\n");
    }

    #[test]
    fn update_of_last_line_without_newline_adds_one() {
        assert_eq!(update_key("A=old", "A", "new").unwrap(), "A=new\n");
    }

    #[test]
    fn update_does_not_double_quote() {
        let out = update_key("A='old'\n", "A", "'new'").unwrap();
        assert_eq!(out, "A='new'\n");
    }

    #[test]
    fn append_fixes_missing_trailing_newline() {
        assert_eq!(update_key("A=1", "B", "2").unwrap(), "A=1\nB=2\n");
        assert_eq!(update_key("", "B", "2").unwrap(), "B=2\n");
    }

    #[test]
    fn assumed_conflicts_are_reported_in_config_order() {
        let envs = [
            env("api", &[("PORT", "1"), ("TOKEN", "a")]),
            env("web", &[("PORT", "\"1\""), ("TOKEN", "b")]),
            env("db", &[("TOKEN", "c")]),
        ];
        let msgs: Vec<_> = find_conflicts(&EnvRules::default(), &envs)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            msgs,
            [
                "Conflict for key 'TOKEN': api=a vs web=b",
                "Conflict for key 'TOKEN': api=a vs db=c",
            ]
        );
    }

    #[test]
    fn ignored_keys_never_conflict() {
        let rules = EnvRules {
            ignore_keys: vec!["PORT".into()],
            ..EnvRules::default()
        };
        let envs = [env("a", &[("PORT", "1")]), env("b", &[("PORT", "2")])];
        assert!(find_conflicts(&rules, &envs).is_empty());
    }

    #[test]
    fn match_group_cross_repo_conflict() {
        let envs = [
            env("api", &[("DB_HOST", "localhost")]),
            env("etl", &[("SQL_SERVER", "db.internal")]),
        ];
        let conflicts = find_conflicts(&sql_rules(), &envs);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(
            conflicts[0].to_string(),
            "Group 'sql' conflict: api.DB_HOST=localhost vs etl.SQL_SERVER=db.internal"
        );
    }

    #[test]
    fn match_group_internal_conflict() {
        let envs = [env("api", &[("DB_HOST", "a"), ("SQL_SERVER", "b")])];
        let conflicts = find_conflicts(&sql_rules(), &envs);
        assert_eq!(
            conflicts[0].to_string(),
            "Internal conflict in 'api' for group 'sql': DB_HOST=a vs SQL_SERVER=b"
        );
    }

    #[test]
    fn strict_mode_fails_warn_mode_passes() {
        let envs = [env("a", &[("X", "1")]), env("b", &[("X", "2")])];
        let conflicts = find_conflicts(&EnvRules::default(), &envs);
        assert_eq!(
            enforce(EnvMode::Strict, &conflicts),
            Err(DomainError::EnvConflicts { count: 1 })
        );
        assert!(enforce(EnvMode::Warn, &conflicts).is_ok());
        assert!(enforce(EnvMode::Strict, &[]).is_ok());
    }

    #[test]
    fn matching_keys_via_group_and_assumed() {
        let envs = [
            env("api", &[("DB_HOST", "h1"), ("PORT", "1")]),
            env("etl", &[("SQL_SERVER", "h2")]),
        ];
        let by_group = find_matching_keys(&sql_rules(), &envs, "DB_HOST");
        assert_eq!(by_group.len(), 2);
        assert_eq!(by_group[1].key, "SQL_SERVER");
        assert_eq!(by_group[1].source.to_string(), "group:sql");

        let assumed = find_matching_keys(&sql_rules(), &envs, "PORT");
        assert_eq!(assumed.len(), 1);
        assert_eq!(assumed[0].source, MatchSource::Assumed);
    }

    #[test]
    fn ignored_target_has_no_matches() {
        let rules = EnvRules {
            ignore_keys: vec!["PORT".into()],
            ..EnvRules::default()
        };
        assert!(find_matching_keys(&rules, &[env("a", &[("PORT", "1")])], "PORT").is_empty());
    }
}
