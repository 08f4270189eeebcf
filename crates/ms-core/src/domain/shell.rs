//! The marker-delimited block `ms` owns inside a shell startup file.
//!
//! Everything between [`BLOCK_START`] and [`BLOCK_END`] belongs to `ms` and
//! is replaced wholesale on install. Content outside the markers is never
//! touched.

use std::fmt::{self, Write as _};
use std::ops::Range;
use std::str::FromStr;

use crate::domain::error::DomainError;

pub const BLOCK_START: &str = "# >>> ms shell integration >>>";
pub const BLOCK_END: &str = "# <<< ms shell integration <<<";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Zsh,
    Bash,
}

impl ShellKind {
    /// Detect from a `$SHELL` value such as `/bin/zsh`.
    pub fn from_shell_path(path: &str) -> Option<Self> {
        let name = path.rsplit('/').next().unwrap_or(path);
        name.parse().ok()
    }

    /// Startup file name relative to `$HOME`.
    pub const fn rc_file(&self) -> &'static str {
        match self {
            Self::Zsh => ".zshrc",
            Self::Bash => ".bashrc",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Zsh => "zsh",
            Self::Bash => "bash",
        }
    }
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShellKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "zsh" => Ok(Self::Zsh),
            "bash" => Ok(Self::Bash),
            other => Err(DomainError::InvalidSetting {
                field: "shell",
                value: other.into(),
            }),
        }
    }
}

/// Site-functions directory zsh should search for the `_ms` completion.
///
/// Homebrew on Apple Silicon installs under `/opt/homebrew`.
pub fn zsh_completion_dir(os: &str, arch: &str) -> &'static str {
    if os == "macos" && arch == "aarch64" {
        "/opt/homebrew/share/zsh/site-functions"
    } else {
        "/usr/local/share/zsh/site-functions"
    }
}

/// Full block text, markers included, each line newline-terminated.
pub fn render_block(shell: ShellKind, os: &str, arch: &str) -> String {
    let mut block = String::new();
    let _ = writeln!(block, "{BLOCK_START}");
    let _ = writeln!(block, "eval \"$(ms aliases)\"");
    match shell {
        ShellKind::Zsh => {
            let _ = writeln!(block, "fpath=({} $fpath)", zsh_completion_dir(os, arch));
        }
        ShellKind::Bash => {
            let _ = writeln!(block, "source <(ms completions bash)");
        }
    }
    let _ = writeln!(block, "{BLOCK_END}");
    block
}

/// A pending change to a startup file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupFileEdit {
    pub original: String,
    pub modified: String,
    pub changes: Vec<String>,
}

impl StartupFileEdit {
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.original != self.modified
    }

    #[must_use]
    pub fn diff_preview(&self) -> String {
        if !self.has_changes() {
            return "No changes needed.".to_string();
        }
        let mut preview = String::new();
        for change in &self.changes {
            let _ = writeln!(preview, "+ {change}");
        }
        preview
    }
}

/// Byte ranges of every complete block, end marker line included.
fn block_ranges(content: &str) -> Result<Vec<Range<usize>>, DomainError> {
    let mut ranges = Vec::new();
    let mut open: Option<usize> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let marker = line.trim();
        if marker == BLOCK_START {
            if open.is_some() {
                return Err(DomainError::MalformedStartupBlock {
                    reason: "start marker appears twice before an end marker".into(),
                });
            }
            open = Some(offset);
        } else if marker == BLOCK_END {
            let Some(start) = open.take() else {
                return Err(DomainError::MalformedStartupBlock {
                    reason: "end marker without a start marker".into(),
                });
            };
            ranges.push(start..offset + line.len());
        }
        offset += line.len();
    }

    if open.is_some() {
        return Err(DomainError::MalformedStartupBlock {
            reason: "start marker without an end marker".into(),
        });
    }
    Ok(ranges)
}

pub fn has_block(content: &str) -> bool {
    block_ranges(content).is_ok_and(|r| !r.is_empty())
}

/// Insert `block`, replacing the first existing block in place and dropping
/// any later duplicates. Without an existing block it is appended after a
/// blank line.
pub fn install(content: &str, block: &str) -> Result<StartupFileEdit, DomainError> {
    let ranges = block_ranges(content)?;
    let mut modified = String::with_capacity(content.len() + block.len() + 2);
    let change;

    match ranges.first() {
        Some(first) => {
            modified.push_str(&content[..first.start]);
            modified.push_str(block);
            let mut cursor = first.end;
            for extra in &ranges[1..] {
                modified.push_str(&content[cursor..extra.start]);
                cursor = extra.end;
            }
            modified.push_str(&content[cursor..]);
            change = "Replace ms shell integration block";
        }
        None => {
            modified.push_str(content);
            if !modified.is_empty() {
                if !modified.ends_with('\n') {
                    modified.push('\n');
                }
                modified.push('\n');
            }
            modified.push_str(block);
            change = "Append ms shell integration block";
        }
    }

    let changes = if modified == content {
        Vec::new()
    } else {
        vec![change.to_string()]
    };
    Ok(StartupFileEdit {
        original: content.to_string(),
        modified,
        changes,
    })
}

/// Remove every block together with the blank line right before it.
pub fn uninstall(content: &str) -> Result<StartupFileEdit, DomainError> {
    let ranges = block_ranges(content)?;
    let mut modified = String::with_capacity(content.len());
    let mut cursor = 0;

    for range in &ranges {
        let before = &content[cursor..range.start];
        let trimmed = before
            .strip_suffix("\n\n")
            .map(|b| format!("{b}\n"))
            .or_else(|| (before == "\n").then(String::new))
            .unwrap_or_else(|| before.to_string());
        modified.push_str(&trimmed);
        cursor = range.end;
    }
    modified.push_str(&content[cursor..]);

    let changes = if ranges.is_empty() {
        Vec::new()
    } else {
        vec!["Remove ms shell integration block".to_string()]
    };
    Ok(StartupFileEdit {
        original: content.to_string(),
        modified,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bash_block() -> String {
        render_block(ShellKind::Bash, "linux", "x86_64")
    }

    #[test]
    fn zsh_dir_depends_on_platform() {
        assert_eq!(
            zsh_completion_dir("macos", "aarch64"),
            "/opt/homebrew/share/zsh/site-functions"
        );
        assert_eq!(
            zsh_completion_dir("macos", "x86_64"),
            "/usr/local/share/zsh/site-functions"
        );
        assert_eq!(
            zsh_completion_dir("linux", "aarch64"),
            "/usr/local/share/zsh/site-functions"
        );
    }

    #[test]
    fn block_wiring_per_shell() {
        let zsh = render_block(ShellKind::Zsh, "macos", "aarch64");
        assert!(zsh.starts_with(BLOCK_START));
        assert!(zsh.contains("eval \"$(ms aliases)\""));
        assert!(zsh.contains("fpath=(/opt/homebrew/share/zsh/site-functions $fpath)"));
        assert!(bash_block().contains("source <(ms completions bash)"));
        assert!(bash_block().ends_with(&format!("{BLOCK_END}\n")));
    }

    #[test]
    fn shell_detection_from_path() {
        assert_eq!(ShellKind::from_shell_path("/bin/zsh"), Some(ShellKind::Zsh));
        assert_eq!(
            ShellKind::from_shell_path("/usr/local/bin/bash"),
            Some(ShellKind::Bash)
        );
        assert_eq!(ShellKind::from_shell_path("/usr/bin/fish"), None);
    }

    #[test]
    fn install_appends_after_blank_line() {
        let edit = install("export A=1", &bash_block()).unwrap();
        assert_eq!(edit.modified, format!("export A=1\n\n{}", bash_block()));
        assert!(edit.has_changes());
    }

    #[test]
    fn install_into_empty_file() {
        let edit = install("", &bash_block()).unwrap();
        assert_eq!(edit.modified, bash_block());
    }

    #[test]
    fn install_twice_is_idempotent() {
        let first = install("export A=1\n", &bash_block()).unwrap();
        let second = install(&first.modified, &bash_block()).unwrap();
        assert!(!second.has_changes());
        assert_eq!(second.modified.matches(BLOCK_START).count(), 1);
        assert_eq!(second.diff_preview(), "No changes needed.");
    }

    #[test]
    fn install_replaces_in_place_and_keeps_surroundings() {
        let content = format!("a\n{BLOCK_START}\nold line\n{BLOCK_END}\nb\n");
        let edit = install(&content, &bash_block()).unwrap();
        assert_eq!(edit.modified, format!("a\n{}b\n", bash_block()));
    }

    #[test]
    fn install_collapses_duplicate_blocks() {
        let content = format!("{BLOCK_START}\nx\n{BLOCK_END}\nmid\n{BLOCK_START}\ny\n{BLOCK_END}\n");
        let edit = install(&content, &bash_block()).unwrap();
        assert_eq!(edit.modified.matches(BLOCK_START).count(), 1);
        assert!(edit.modified.contains("mid\n"));
    }

    #[test]
    fn unbalanced_markers_are_rejected() {
        let content = format!("{BLOCK_START}\nno end\n");
        assert!(matches!(
            install(&content, &bash_block()),
            Err(DomainError::MalformedStartupBlock { .. })
        ));
        assert!(uninstall(&format!("{BLOCK_END}\n")).is_err());
        assert!(!has_block(&content));
    }

    #[test]
    fn uninstall_restores_original() {
        let original = "export A=1\n";
        let installed = install(original, &bash_block()).unwrap().modified;
        assert!(has_block(&installed));
        let removed = uninstall(&installed).unwrap();
        assert_eq!(removed.modified, original);
    }

    #[test]
    fn uninstall_without_block_changes_nothing() {
        let edit = uninstall("export A=1\n").unwrap();
        assert!(!edit.has_changes());
        assert!(edit.changes.is_empty());
    }
}
