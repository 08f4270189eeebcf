//! Output management and formatting.

use std::io::{self, IsTerminal};
use std::time::Duration;

use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{AnsiColors, OwoColorize};

use ms_core::domain::{NamedColor, RepoColor};

use crate::cli::GlobalArgs;
use crate::config::AppConfig;

/// Manages CLI output based on flags and settings.
pub struct OutputManager {
    quiet: bool,
    no_color: bool,
    term: Term,
    err: Term,
}

impl OutputManager {
    /// Build an `OutputManager` from parsed CLI flags and loaded settings.
    pub fn new(args: &GlobalArgs, config: &AppConfig) -> Self {
        Self {
            quiet: args.quiet,
            no_color: args.no_color || config.output.no_color,
            term: Term::stdout(),
            err: Term::stderr(),
        }
    }

    // ── Public write methods ───────────────────────────────────────────────

    /// Generic message; suppressed in quiet mode.
    pub fn print(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(msg)
    }

    /// Data the caller asked for (`aliases`, `complete`, `prompt`,
    /// `config get`). Printed even in quiet mode.
    pub fn data(&self, msg: &str) -> io::Result<()> {
        self.term.write_line(msg)
    }

    /// Success indicator: `✓ <msg>`.
    pub fn success(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2713} {msg}") // ✓
        } else {
            format!("{} {}", "\u{2713}".green().bold(), msg.green())
        };
        self.term.write_line(&line)
    }

    /// Error indicator: `✗ <msg>` on stderr.  *Not* suppressed in quiet
    /// mode.
    pub fn error(&self, msg: &str) -> io::Result<()> {
        let line = if self.no_color {
            format!("\u{2717} {msg}") // ✗
        } else {
            format!("{} {}", "\u{2717}".red().bold(), msg.red())
        };
        self.err.write_line(&line)
    }

    /// Plain line on stderr, never suppressed. Env conflicts go here.
    pub fn stderr(&self, msg: &str) -> io::Result<()> {
        self.err.write_line(msg)
    }

    /// Warning indicator: `⚠ <msg>`.
    pub fn warning(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{26a0} {msg}") // ⚠
        } else {
            format!("{} {}", "\u{26a0}".yellow().bold(), msg.yellow())
        };
        self.err.write_line(&line)
    }

    /// Informational indicator: `ℹ <msg>`.
    pub fn info(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2139} {msg}") // ℹ
        } else {
            format!("{} {}", "\u{2139}".blue().bold(), msg.blue())
        };
        self.term.write_line(&line)
    }

    /// Bold cyan header line.
    pub fn header(&self, text: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            text.to_owned()
        } else {
            text.cyan().bold().to_string()
        };
        self.term.write_line(&line)
    }

    /// Header in the repository's configured colour.
    pub fn repo_header(&self, text: &str, color: RepoColor) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(&self.paint(text, color))
    }

    /// Yellow detail line, e.g. the `[ahead 1]` marker under a status header.
    pub fn highlight(&self, text: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            text.to_owned()
        } else {
            text.yellow().to_string()
        };
        self.term.write_line(&line)
    }

    fn paint(&self, text: &str, color: RepoColor) -> String {
        if self.no_color {
            return text.to_owned();
        }
        match color {
            RepoColor::Named(named) => text.color(ansi(named)).bold().to_string(),
            RepoColor::Rgb(r, g, b) => text.truecolor(r, g, b).bold().to_string(),
        }
    }

    /// Spinner for captured operations. Hidden when stderr is not a
    /// terminal or output is quiet.
    pub fn spinner(&self, msg: impl Into<String>) -> ProgressBar {
        if self.quiet || !io::stderr().is_terminal() {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(msg.into());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// `true` if ANSI colours are enabled.
    pub fn supports_color(&self) -> bool {
        !self.no_color
    }

    /// `true` if quiet mode suppresses most output.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

const fn ansi(color: NamedColor) -> AnsiColors {
    match color {
        NamedColor::Black => AnsiColors::Black,
        NamedColor::Red => AnsiColors::Red,
        NamedColor::Green => AnsiColors::Green,
        NamedColor::Yellow => AnsiColors::Yellow,
        NamedColor::Blue => AnsiColors::Blue,
        NamedColor::Magenta => AnsiColors::Magenta,
        NamedColor::Cyan => AnsiColors::Cyan,
        NamedColor::White => AnsiColors::White,
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_manager(quiet: bool, no_color: bool) -> OutputManager {
        let args = GlobalArgs {
            quiet,
            no_color,
            ..GlobalArgs::default()
        };
        OutputManager::new(&args, &AppConfig::default())
    }

    #[test]
    fn quiet_suppresses_print() {
        let out = make_manager(true, true);
        assert!(out.print("hello").is_ok());
        assert!(out.is_quiet());
    }

    #[test]
    fn error_not_suppressed_in_quiet_mode() {
        let out = make_manager(true, true);
        assert!(out.error("something went wrong").is_ok());
    }

    #[test]
    fn no_color_flag_reported() {
        assert!(make_manager(false, false).supports_color());
        assert!(!make_manager(false, true).supports_color());
    }

    #[test]
    fn settings_can_disable_color() {
        let mut config = AppConfig::default();
        config.output.no_color = true;
        let out = OutputManager::new(&GlobalArgs::default(), &config);
        assert!(!out.supports_color());
    }

    #[test]
    fn plain_headers_have_no_escapes() {
        let out = make_manager(false, true);
        assert_eq!(out.paint("--- db ---", RepoColor::ORANGE), "--- db ---");
    }

    #[test]
    fn hex_colors_render_as_truecolor() {
        let out = make_manager(false, false);
        let painted = out.paint("--- db ---", RepoColor::ORANGE);
        assert!(painted.contains("38;2;255;165;0"));
    }

    #[test]
    fn quiet_spinner_is_hidden() {
        assert!(make_manager(true, true).spinner("working").is_hidden());
    }
}
