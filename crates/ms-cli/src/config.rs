//! Tool settings.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns these settings; the core crate only sees the values
//! handed to its services (remote name, timeouts). The workspace's own
//! `ms-config.json` is a different file, handled by `ms-core`.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. Environment variables: `MS_GIT__DEFAULT_BRANCH=develop`
//! 3. Settings file: `--config FILE` or `~/.config/ms/config.toml`
//! 4. Built-in defaults (always present)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use ms_core::application::MigrationTimeouts;

const ENV_PREFIX: &str = "MS";

/// Tool settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub git: GitConfig,
    pub output: OutputConfig,
    pub prompt: PromptConfig,
    pub migration: MigrationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Branch that `push --force` refuses and `pr create` targets.
    pub default_branch: String,
    pub remote: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Ask before reset, prune, `compose down -v`, terraform apply/destroy.
    pub confirm_destructive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub current_timeout_secs: u64,
    pub migrate_timeout_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".into(),
            remote: "origin".into(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            confirm_destructive: true,
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            current_timeout_secs: 25,
            migrate_timeout_secs: 30,
        }
    }
}

impl MigrationConfig {
    pub fn timeouts(&self) -> MigrationTimeouts {
        MigrationTimeouts {
            current: Duration::from_secs(self.current_timeout_secs),
            migrate: Duration::from_secs(self.migrate_timeout_secs),
        }
    }
}

impl AppConfig {
    /// Load settings: defaults, then the settings file, then `MS_*`
    /// environment variables.
    ///
    /// An explicit `--config` file must exist; the default location is
    /// optional.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        let (path, required) = match config_file {
            Some(p) => (p.clone(), true),
            None => (Self::config_path(), false),
        };
        Self::load_from(&path, required, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_from(path: &Path, required: bool, env: Environment) -> anyhow::Result<Self> {
        let defaults =
            Config::try_from(&Self::default()).context("Failed to encode default settings")?;
        Config::builder()
            .add_source(defaults)
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(required),
            )
            .add_source(env.prefix_separator("_").separator("__").try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read settings from {}", path.display()))?
            .try_deserialize()
            .context("Invalid settings")
    }

    /// Path to the default settings file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.ms.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "ms")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".ms.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX).source(Some(config::Map::new()))
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.git.default_branch, "main");
        assert_eq!(cfg.git.remote, "origin");
        assert!(cfg.prompt.confirm_destructive);
        assert_eq!(cfg.migration.timeouts(), MigrationTimeouts::default());
    }

    #[test]
    fn missing_optional_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::load_from(&dir.path().join("none.toml"), false, no_env()).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(AppConfig::load_from(&dir.path().join("none.toml"), true, no_env()).is_err());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[git]\ndefault_branch = \"develop\"\n").unwrap();

        let cfg = AppConfig::load_from(&path, true, no_env()).unwrap();
        assert_eq!(cfg.git.default_branch, "develop");
        assert_eq!(cfg.git.remote, "origin");
    }

    #[test]
    fn env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[migration]\ncurrent_timeout_secs = 5\n").unwrap();

        let env = Environment::with_prefix(ENV_PREFIX).source(Some(config::Map::from([(
            "MS_MIGRATION__CURRENT_TIMEOUT_SECS".to_string(),
            "40".to_string(),
        )])));
        let cfg = AppConfig::load_from(&path, true, env).unwrap();
        assert_eq!(cfg.migration.current_timeout_secs, 40);
    }

    #[test]
    fn config_path_is_not_empty() {
        assert!(!AppConfig::config_path().as_os_str().is_empty());
    }
}
