//! `ms setup`: interactive editor for `ms-config.json`.
//!
//! Works without an existing config (it starts from the defaults) and
//! saves after every change. Every prompt has a default that leaves the
//! menu, so piped input that runs out ends the session cleanly.

use tracing::{info, instrument};

use ms_core::domain::{EnvMode, MissingEnvPolicy, RepoColor, RepoConfig, RepoKind, WorkspaceConfig};

use crate::{context::Context, error::CliResult, interact};

/// Whether a sub-menu asked to leave setup altogether.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

const MAIN_MENU: [&str; 5] = ["Add repo", "Modify repo", "Remove repo", "Modify env rules", "Exit"];
const ENV_MENU: [&str; 5] = [
    "Change Mode (strict/warn)",
    "Change Missing Env File Behavior",
    "Manage Ignore Keys",
    "Manage Match Groups",
    "Back",
];

#[instrument(skip_all)]
pub fn execute(ctx: &Context) -> CliResult<()> {
    let config = ctx.workspace.load(false)?;
    let mut setup = Setup { ctx, config };
    setup.run()?;
    setup.save()?;
    setup.health_check()
}

struct Setup<'a> {
    ctx: &'a Context,
    config: WorkspaceConfig,
}

impl Setup<'_> {
    fn run(&mut self) -> CliResult<()> {
        loop {
            self.say("")?;
            self.ctx.output.header("--- ms setup ---")?;
            self.menu(&MAIN_MENU)?;
            match self.choose("Select option (0 to exit)", MAIN_MENU.len(), "5")? {
                1 => self.add_repo()?,
                2 => self.modify_repo()?,
                3 => self.remove_repo()?,
                4 => {
                    if self.env_rules()? == Flow::Exit {
                        return Ok(());
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn save(&self) -> CliResult<()> {
        self.ctx.workspace.save(&self.config)?;
        Ok(())
    }

    fn health_check(&self) -> CliResult<()> {
        self.say("")?;
        self.say("Running health checks...")?;
        let problems = self.ctx.workspace.health_check(&self.config);
        if problems.is_empty() {
            self.ctx.output.success("Health check passed.")?;
        }
        for problem in problems {
            self.ctx
                .output
                .warning(&format!("Health check warning: {problem}"))?;
        }
        Ok(())
    }

    // ── repositories ──────────────────────────────────────────────────────

    fn add_repo(&mut self) -> CliResult<()> {
        let candidates = self.ctx.workspace.discover_candidates(&self.config)?;
        if candidates.is_empty() {
            return self.say("No new git repositories found in workspace root.");
        }
        self.say("")?;
        self.say("Available repositories:")?;
        self.numbered(candidates.iter().map(String::as_str))?;
        let pick = self.choose("Choose repo to add (0 to cancel)", candidates.len(), "0")?;
        let Some(name) = pick.checked_sub(1).and_then(|i| candidates.get(i)) else {
            return Ok(());
        };

        let alias = loop {
            let alias = self.ask(&format!("Enter alias for {name}"), "")?;
            if alias.trim().is_empty() {
                return self.say("Alias cannot be empty.");
            }
            if !self.config.alias_in_use(&alias) {
                break alias;
            }
            self.say(&format!("Alias '{alias}' already in use."))?;
        };

        self.say("")?;
        self.say("Available types: app, db-alembic")?;
        let kind = loop {
            let answer = self.ask("Type", "app")?;
            match answer.parse::<RepoKind>() {
                Ok(RepoKind::DbAlembic) => match self.config.alembic_repo() {
                    Some(existing) => self.say(&format!(
                        "Error: A db-alembic repo already exists ({}). Only one allowed.",
                        existing.name
                    ))?,
                    None => break RepoKind::DbAlembic,
                },
                Ok(kind) => break kind,
                Err(err) => self.say(&err.to_string())?,
            }
        };

        let env_file = self.ask("Env file name", ".env")?;
        let mut repo = RepoConfig::new(name.clone(), alias).with_env_file(env_file);
        if kind == RepoKind::DbAlembic {
            let dir = self.ask("Alembic revisions directory", "")?;
            if dir.trim().is_empty() {
                return self.say("A db-alembic repo needs a revisions directory.");
            }
            repo = repo.with_alembic(dir.trim());
        }
        repo = repo.with_color(self.pick_color()?);

        if let Err(err) = self.config.add_repo(repo) {
            return Ok(self.ctx.output.error(&err.to_string())?);
        }
        self.save()?;
        info!(repo = %name, "Repository added");
        self.say(&format!("Repo {name} added."))
    }

    fn modify_repo(&mut self) -> CliResult<()> {
        let Some(index) = self.pick_repo("Select repo to modify (0 to cancel)")? else {
            return Ok(());
        };

        let current = self.config.repositories[index].alias.clone();
        let alias = self.ask("Alias", &current)?;
        if alias != current && self.config.set_alias(index, &alias).is_err() {
            self.say("Alias already in use. Keeping old alias.")?;
        }

        let current = self.config.repositories[index].env_file.clone();
        let env_file = self.ask("Env file", &current)?;
        self.config.repositories[index].env_file = env_file;

        if self.config.repositories[index].kind == RepoKind::DbAlembic {
            let current = self.config.repositories[index]
                .revisions_directory()
                .unwrap_or_default()
                .to_string();
            let dir = self.ask("Revisions directory", &current)?;
            if !dir.trim().is_empty() {
                let repo = self.config.repositories[index].clone();
                self.config.repositories[index] = repo.with_alembic(dir.trim());
            }
        }

        self.say(&format!("Current color: {}", self.config.repositories[index].color))?;
        if self.ctx.prompter.confirm("Change color?", false)? {
            self.config.repositories[index].color = self.pick_color()?;
        }

        self.save()?;
        self.say("Repo updated.")
    }

    fn remove_repo(&mut self) -> CliResult<()> {
        let Some(index) = self.pick_repo("Select repo to remove (0 to cancel)")? else {
            return Ok(());
        };
        if let Some(removed) = self.config.remove_repo(index) {
            self.save()?;
            info!(repo = %removed.name, "Repository removed");
            self.say(&format!("Removed {}.", removed.name))?;
        }
        Ok(())
    }

    /// Index of a configured repository, `None` on cancel.
    fn pick_repo(&self, prompt: &str) -> CliResult<Option<usize>> {
        if self.config.repositories.is_empty() {
            self.say("No repositories configured.")?;
            return Ok(None);
        }
        self.say("")?;
        self.say("Configured repositories:")?;
        let labels: Vec<String> = self
            .config
            .repositories
            .iter()
            .map(|r| format!("{} ({})", r.name, r.alias))
            .collect();
        self.numbered(labels.iter().map(String::as_str))?;
        let pick = self.choose(prompt, labels.len(), "0")?;
        Ok(pick.checked_sub(1))
    }

    /// Palette entries 1-6, 7 for a custom hex value. Anything else keeps
    /// the first palette colour.
    fn pick_color(&self) -> CliResult<RepoColor> {
        let palette = RepoColor::palette();
        self.say("")?;
        self.say("Select color:")?;
        self.numbered(palette.iter().map(|(label, _)| *label).chain(["Custom Hex"]))?;

        let choice = self.choose("Select color", palette.len() + 1, "1")?;
        if choice == palette.len() + 1 {
            let hex = self.ask("Enter hex code (e.g. #ff00ff)", "")?;
            return match RepoColor::parse_hex(hex.trim()) {
                Ok(color) => Ok(color),
                Err(_) => {
                    self.say("Invalid hex format. Must be #RRGGBB")?;
                    Ok(palette[0].1)
                }
            };
        }
        Ok(choice
            .checked_sub(1)
            .and_then(|i| palette.get(i))
            .map_or(palette[0].1, |(_, color)| *color))
    }

    // ── env rules ─────────────────────────────────────────────────────────

    fn env_rules(&mut self) -> CliResult<Flow> {
        loop {
            let rules = &self.config.env;
            self.say("")?;
            self.ctx.output.header("--- Modify Env Rules ---")?;
            self.say(&format!("Mode: {}", rules.mode))?;
            self.say(&format!("Missing Env File: {}", rules.missing_env_file))?;
            self.say(&format!("Ignore Keys: {}", rules.ignore_keys.len()))?;
            self.say(&format!("Match Groups: {}", rules.match_groups.len()))?;
            self.menu(&ENV_MENU)?;

            match self.choose("Select option (0 to exit)", ENV_MENU.len(), "5")? {
                0 => return Ok(Flow::Exit),
                1 => {
                    let answer = self.ask("Mode (strict/warn)", &self.config.env.mode.to_string())?;
                    match answer.parse::<EnvMode>() {
                        Ok(mode) => {
                            self.config.env.mode = mode;
                            self.save()?;
                        }
                        Err(err) => self.ctx.output.error(&err.to_string())?,
                    }
                }
                2 => {
                    let current = self.config.env.missing_env_file.to_string();
                    let answer = self.ask("Behavior (strict/warn/ignore)", &current)?;
                    match answer.parse::<MissingEnvPolicy>() {
                        Ok(policy) => {
                            self.config.env.missing_env_file = policy;
                            self.save()?;
                        }
                        Err(err) => self.ctx.output.error(&err.to_string())?,
                    }
                }
                3 => self.ignore_keys()?,
                4 => self.match_groups()?,
                _ => return Ok(Flow::Continue),
            }
        }
    }

    fn ignore_keys(&mut self) -> CliResult<()> {
        loop {
            self.say("")?;
            self.ctx.output.header("--- Ignore Keys ---")?;
            if self.config.env.ignore_keys.is_empty() {
                self.say("(No keys ignored)")?;
            } else {
                self.numbered(self.config.env.ignore_keys.iter().map(String::as_str))?;
            }
            self.sub_options("Add key", "Remove key")?;

            match self.choose("Select option (0 to exit)", 3, "3")? {
                1 => {
                    let key = self.ask("Enter key to ignore", "")?;
                    if self.config.env.add_ignore_key(&key) {
                        self.save()?;
                        self.say(&format!("Added {}.", key.trim()))?;
                    } else {
                        self.say("Key already ignored.")?;
                    }
                }
                2 if !self.config.env.ignore_keys.is_empty() => {
                    let count = self.config.env.ignore_keys.len();
                    let pick = self.choose("Select number to remove (0 to cancel)", count, "0")?;
                    if let Some(removed) = pick
                        .checked_sub(1)
                        .and_then(|i| self.config.env.remove_ignore_key(i))
                    {
                        self.save()?;
                        self.say(&format!("Removed {removed}."))?;
                    }
                }
                2 => {}
                _ => return Ok(()),
            }
        }
    }

    fn match_groups(&mut self) -> CliResult<()> {
        loop {
            self.say("")?;
            self.ctx.output.header("--- Match Groups ---")?;
            if self.config.env.match_groups.is_empty() {
                self.say("(No match groups defined)")?;
            } else {
                let labels: Vec<String> = self
                    .config
                    .env
                    .match_groups
                    .iter()
                    .map(|g| format!("{} [{}]", g.name, g.keys.join(", ")))
                    .collect();
                self.numbered(labels.iter().map(String::as_str))?;
            }
            self.sub_options("Add group", "Remove group")?;

            match self.choose("Select option (0 to exit)", 3, "3")? {
                1 => {
                    let name = self.ask("Group name (e.g., 'sql-server')", "")?;
                    let keys = self.ask("Comma-separated keys (e.g., 'DB_HOST,SQL_SERVER')", "")?;
                    match self.config.env.add_match_group(&name, &keys) {
                        Ok(()) => {
                            self.save()?;
                            self.say(&format!("Added group '{}'.", name.trim()))?;
                        }
                        Err(_) => self.say("Invalid input. Name and at least one key required.")?,
                    }
                }
                2 if !self.config.env.match_groups.is_empty() => {
                    let count = self.config.env.match_groups.len();
                    let pick = self.choose("Select number to remove (0 to cancel)", count, "0")?;
                    if let Some(removed) = pick
                        .checked_sub(1)
                        .and_then(|i| self.config.env.remove_match_group(i))
                    {
                        self.save()?;
                        self.say(&format!("Removed group '{}'.", removed.name))?;
                    }
                }
                2 => {}
                _ => return Ok(()),
            }
        }
    }

    // ── prompt helpers ────────────────────────────────────────────────────

    fn say(&self, line: &str) -> CliResult<()> {
        Ok(self.ctx.output.print(line)?)
    }

    fn menu(&self, items: &[&str]) -> CliResult<()> {
        self.numbered(items.iter().copied())
    }

    fn numbered<'s>(&self, items: impl IntoIterator<Item = &'s str>) -> CliResult<()> {
        for (i, item) in items.into_iter().enumerate() {
            self.say(&format!("{}. {item}", i + 1))?;
        }
        Ok(())
    }

    fn sub_options(&self, add: &str, remove: &str) -> CliResult<()> {
        self.say("")?;
        self.say("Options:")?;
        self.menu(&[add, remove, "Back"])
    }

    fn ask(&self, prompt: &str, default: &str) -> CliResult<String> {
        Ok(self.ctx.input(prompt, default)?.trim().to_string())
    }

    fn choose(&self, prompt: &str, max: usize, default: &str) -> CliResult<usize> {
        Ok(interact::choose(self.ctx.prompter.as_ref(), prompt, max, default)?)
    }
}
