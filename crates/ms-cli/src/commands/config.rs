//! `ms config`: read and write the tool settings file.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::{
    cli::ConfigCommands,
    config::AppConfig,
    context::Context,
    error::{CliError, CliResult, IntoCli},
};

/// Every key `get` and `set` accept.
const KEYS: [&str; 6] = [
    "git.default_branch",
    "git.remote",
    "output.no_color",
    "prompt.confirm_destructive",
    "migration.current_timeout_secs",
    "migration.migrate_timeout_secs",
];

/// Dispatch to the correct config subcommand.
pub fn execute(cmd: ConfigCommands, ctx: &Context) -> CliResult<()> {
    let path = settings_path(ctx);
    match cmd {
        ConfigCommands::Get { key } => {
            let value = get_config_value(&ctx.config, &key)?;
            ctx.output.data(&value)?;
        }

        ConfigCommands::Set { key, value } => {
            let updated = set_config_value(&read_table(&path)?, &key, &value)?;
            write_table(&path, &updated)?;
            info!(key, path = %path.display(), "Setting saved");
            ctx.output
                .success(&format!("{key} = {value} ({})", path.display()))?;
        }

        ConfigCommands::List => {
            ctx.output.header("Current settings:")?;
            ctx.output.data(serialise(&ctx.config)?.trim_end())?;
        }

        ConfigCommands::Path => {
            ctx.output.data(&path.display().to_string())?;
        }

        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigError {
                    message: format!("{} already exists (use --force to overwrite)", path.display()),
                    source: None,
                });
            }
            write_settings(&path, &serialise(&AppConfig::default())?)?;
            ctx.output
                .success(&format!("Wrote default settings to {}", path.display()))?;
        }
    }

    Ok(())
}

fn settings_path(ctx: &Context) -> PathBuf {
    ctx.global
        .config
        .clone()
        .unwrap_or_else(AppConfig::config_path)
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn unknown_key(key: &str) -> CliError {
    CliError::ConfigError {
        message: format!("Unknown config key: '{key}' (known: {})", KEYS.join(", ")),
        source: None,
    }
}

fn get_config_value(config: &AppConfig, key: &str) -> CliResult<String> {
    match key {
        "git.default_branch" => Ok(config.git.default_branch.clone()),
        "git.remote" => Ok(config.git.remote.clone()),
        "output.no_color" => Ok(config.output.no_color.to_string()),
        "prompt.confirm_destructive" => Ok(config.prompt.confirm_destructive.to_string()),
        "migration.current_timeout_secs" => Ok(config.migration.current_timeout_secs.to_string()),
        "migration.migrate_timeout_secs" => Ok(config.migration.migrate_timeout_secs.to_string()),
        _ => Err(unknown_key(key)),
    }
}

/// Set `key` in the settings table. The result must still deserialise, so
/// `prompt.confirm_destructive = maybe` is rejected.
fn set_config_value(table: &toml::Table, key: &str, raw: &str) -> CliResult<toml::Table> {
    let (section, field) = key
        .split_once('.')
        .filter(|_| KEYS.contains(&key))
        .ok_or_else(|| unknown_key(key))?;

    let typed = if let Ok(b) = raw.parse::<bool>() {
        Some(toml::Value::Boolean(b))
    } else {
        raw.parse::<i64>().ok().map(toml::Value::Integer)
    };

    // A string field can hold "42" or "true" too, so the typed guess falls
    // back to the raw string.
    let mut last_err = None;
    for value in typed.into_iter().chain([toml::Value::String(raw.to_string())]) {
        let mut updated = table.clone();
        let entry = updated
            .entry(section)
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        let toml::Value::Table(section_table) = entry else {
            return Err(CliError::ConfigError {
                message: format!("'{section}' in the settings file is not a table"),
                source: None,
            });
        };
        section_table.insert(field.to_string(), value);

        match toml::Value::Table(updated.clone()).try_into::<AppConfig>() {
            Ok(_) => return Ok(updated),
            Err(e) => last_err = Some(e),
        }
    }
    Err(CliError::ConfigError {
        message: format!("Invalid value for {key}: {raw}"),
        source: last_err.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
    })
}

fn read_table(path: &Path) -> CliResult<toml::Table> {
    if !path.exists() {
        return Ok(toml::Table::new());
    }
    let content = std::fs::read_to_string(path)
        .with_cli_context(|| format!("Cannot read {}", path.display()))?;
    content.parse::<toml::Table>().map_err(|e| CliError::ConfigError {
        message: format!("Failed to parse {}", path.display()),
        source: Some(Box::new(e)),
    })
}

fn serialise<T: serde::Serialize>(value: &T) -> CliResult<String> {
    toml::to_string_pretty(value).map_err(|e| CliError::ConfigError {
        message: format!("Failed to serialise settings: {e}"),
        source: Some(Box::new(e)),
    })
}

fn write_table(path: &Path, table: &toml::Table) -> CliResult<()> {
    write_settings(path, &serialise(table)?)
}

fn write_settings(path: &Path, content: &str) -> CliResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_cli_context(|| format!("Cannot create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_cli_context(|| format!("Cannot write {}", path.display()))
}

// ── tests ─────────────────────────────────────────────────────────────────────
