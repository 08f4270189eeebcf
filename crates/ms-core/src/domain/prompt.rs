//! Prompt segment: `(<branch><dirty>↑N↓N)`.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;

/// How colour escapes are wrapped so the shell can measure the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    #[default]
    Plain,
    Zsh,
    Bash,
}

impl FromStr for PromptStyle {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "zsh" => Ok(Self::Zsh),
            "bash" => Ok(Self::Bash),
            other => Err(DomainError::InvalidSetting {
                field: "prompt format",
                value: other.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptInfo {
    pub branch: String,
    pub dirty: bool,
    pub ahead: u32,
    pub behind: u32,
}

impl PromptInfo {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            ..Self::default()
        }
    }

    /// Render with colour for `style`. Plain output carries no escapes.
    pub fn render(&self, style: PromptStyle) -> String {
        let colour = if self.dirty { "33" } else { "32" };
        let esc = |code: &str| {
            let raw = format!("\x1b[{code}m");
            match style {
                PromptStyle::Plain => String::new(),
                PromptStyle::Zsh => format!("%{{{raw}%}}"),
                PromptStyle::Bash => format!("\\[{raw}\\]"),
            }
        };
        format!("{}{self}{}", esc(colour), esc("0"))
    }
}

impl fmt::Display for PromptInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.branch)?;
        if self.dirty {
            f.write_str("*")?;
        }
        if self.ahead > 0 {
            write!(f, "↑{}", self.ahead)?;
        }
        if self.behind > 0 {
            write!(f, "↓{}", self.behind)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_branch() {
        assert_eq!(PromptInfo::new("main").render(PromptStyle::Plain), "(main)");
    }

    #[test]
    fn dirty_with_counts() {
        let info = PromptInfo {
            branch: "feat".into(),
            dirty: true,
            ahead: 2,
            behind: 1,
        };
        assert_eq!(info.to_string(), "(feat*↑2↓1)");
    }

    #[test]
    fn shell_styles_wrap_escapes() {
        let info = PromptInfo::new("main");
        assert_eq!(info.render(PromptStyle::Zsh), "%{\x1b[32m%}(main)%{\x1b[0m%}");
        assert_eq!(info.render(PromptStyle::Bash), "\\[\x1b[32m\\](main)\\[\x1b[0m\\]");
    }

    #[test]
    fn unknown_style_is_rejected() {
        assert!("fish".parse::<PromptStyle>().is_err());
    }
}
