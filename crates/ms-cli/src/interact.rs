//! Interactive prompts.
//!
//! Commands ask through the [`Prompter`] trait so tests can script the
//! answers. On a terminal the `interactive` feature uses `dialoguer`;
//! otherwise answers are read line by line from stdin, which is what lets
//! `printf 'n\n' | ms reset main` decline a confirmation.

use std::io::{self, BufRead, Write};

/// Source of answers for confirmations and free-text input.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter {
    /// Yes/no question. End of input counts as `default`.
    fn confirm(&self, prompt: &str, default: bool) -> io::Result<bool>;

    /// Free text. An empty answer returns `default` (which may be empty).
    fn input(&self, prompt: &str, default: &str) -> io::Result<String>;
}

/// Pick the prompter for this process.
pub fn default_prompter() -> Box<dyn Prompter> {
    terminal_prompter().unwrap_or_else(|| Box::new(LinePrompter))
}

#[cfg(feature = "interactive")]
fn terminal_prompter() -> Option<Box<dyn Prompter>> {
    use std::io::IsTerminal;
    (io::stdin().is_terminal() && io::stderr().is_terminal())
        .then(|| Box::new(TerminalPrompter) as Box<dyn Prompter>)
}

#[cfg(not(feature = "interactive"))]
fn terminal_prompter() -> Option<Box<dyn Prompter>> {
    None
}

/// `dialoguer` prompts on the attached terminal.
#[cfg(feature = "interactive")]
pub struct TerminalPrompter;

#[cfg(feature = "interactive")]
impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> io::Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|e| io::Error::other(e.to_string()))
    }

    fn input(&self, prompt: &str, default: &str) -> io::Result<String> {
        let mut input = dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true);
        if !default.is_empty() {
            input = input.default(default.to_string());
        }
        input
            .interact_text()
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

/// Reads answers from stdin, one per line. Used when stdin is piped.
pub struct LinePrompter;

impl LinePrompter {
    fn read_answer(prompt: &str) -> io::Result<Option<String>> {
        let mut stderr = io::stderr();
        write!(stderr, "{prompt}: ")?;
        stderr.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            writeln!(stderr)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl Prompter for LinePrompter {
    fn confirm(&self, prompt: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let answer = Self::read_answer(&format!("{prompt} {hint}"))?;
        Ok(parse_yes_no(answer.as_deref(), default))
    }

    fn input(&self, prompt: &str, default: &str) -> io::Result<String> {
        let shown = if default.is_empty() {
            prompt.to_string()
        } else {
            format!("{prompt} [{default}]")
        };
        Ok(match Self::read_answer(&shown)? {
            Some(answer) if !answer.is_empty() => answer,
            _ => default.to_string(),
        })
    }
}

fn parse_yes_no(answer: Option<&str>, default: bool) -> bool {
    match answer.map(str::to_ascii_lowercase).as_deref() {
        Some("y" | "yes") => true,
        Some("n" | "no") => false,
        _ => default,
    }
}

/// Ask for a number in `0..=max`. Anything else counts as 0 (cancel).
pub fn choose(prompter: &dyn Prompter, prompt: &str, max: usize, default: &str) -> io::Result<usize> {
    let answer = prompter.input(prompt, default)?;
    Ok(answer
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n <= max)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_no_answers() {
        assert!(parse_yes_no(Some("y"), false));
        assert!(parse_yes_no(Some("YES"), false));
        assert!(!parse_yes_no(Some("n"), true));
        assert!(!parse_yes_no(None, false));
        assert!(parse_yes_no(Some(""), true));
        assert!(!parse_yes_no(Some("maybe"), false));
    }

    #[test]
    fn choose_rejects_out_of_range() {
        let mut prompter = MockPrompter::new();
        prompter
            .expect_input()
            .returning(|_, _| Ok("9".to_string()));
        assert_eq!(choose(&prompter, "Pick", 3, "").unwrap(), 0);
    }

    #[test]
    fn choose_accepts_in_range() {
        let mut prompter = MockPrompter::new();
        prompter
            .expect_input()
            .withf(|p, d| p.to_string() == "Select option (0 to exit)" && d.to_string() == "5")
            .returning(|_, _| Ok(" 2 ".to_string()));
        assert_eq!(choose(&prompter, "Select option (0 to exit)", 5, "5").unwrap(), 2);
    }
}
