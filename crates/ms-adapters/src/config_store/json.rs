//! `ms-config.json` on disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use ms_core::{
    application::{ApplicationError, ports::ConfigStore},
    domain::{CONFIG_FILENAME, WorkspaceConfig, workspace},
    error::MsResult,
};

use crate::filesystem::{map_io_error, write_atomic};

/// Reads and writes the workspace config as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<root>/ms-config.json`.
    pub fn in_workspace(root: &Path) -> Self {
        Self::new(root.join(CONFIG_FILENAME))
    }

    fn parse_error(&self, reason: impl ToString) -> ApplicationError {
        ApplicationError::ConfigParse {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl ConfigStore for JsonConfigStore {
    fn location(&self) -> PathBuf {
        self.path.clone()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> MsResult<WorkspaceConfig> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ApplicationError::ConfigNotFound {
                    path: self.path.clone(),
                }
                .into());
            }
            Err(e) => return Err(map_io_error(&self.path, e, "read config")),
        };

        let raw: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| self.parse_error(e))?;
        workspace::check_schema_version(&raw)?;
        let config: WorkspaceConfig =
            serde_json::from_value(raw).map_err(|e| self.parse_error(e))?;

        debug!(repos = config.repositories.len(), "Loaded workspace config");
        Ok(config)
    }

    fn save(&self, config: &WorkspaceConfig) -> MsResult<()> {
        let mut json = serde_json::to_string_pretty(config).map_err(|e| self.parse_error(e))?;
        json.push('\n');
        write_atomic(&self.path, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ms_core::domain::{RepoColor, RepoConfig};
    use ms_core::error::{ErrorCategory, MsError};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> JsonConfigStore {
        JsonConfigStore::in_workspace(dir.path())
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let dir = TempDir::new().unwrap();
        let err = store(&dir).load().unwrap_err();
        assert_eq!(err.to_string(), "ms-config.json not found. Run: ms setup.");
        assert_eq!(err.category(), ErrorCategory::Preflight);
    }

    #[test]
    fn invalid_json_carries_parser_message() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "{ nope").unwrap();
        let err = store(&dir).load().unwrap_err();
        assert!(err.to_string().starts_with("ms-config.json invalid JSON: "));
    }

    #[test]
    fn wrong_schema_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"{"schemaVersion": 2, "repositories": []}"#,
        )
        .unwrap();
        let err = store(&dir).load().unwrap_err();
        assert!(matches!(err, MsError::Domain(_)));
        assert!(err.to_string().contains("Unsupported schemaVersion"));
    }

    #[test]
    fn saved_config_is_pretty_with_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let mut config = WorkspaceConfig::default();
        config
            .add_repo(RepoConfig::new("core-service", "cs").with_color(RepoColor::ORANGE))
            .unwrap();

        store(&dir).save(&config).unwrap();
        let written = fs::read_to_string(dir.path().join(CONFIG_FILENAME)).unwrap();
        assert!(written.starts_with("{\n  \"schemaVersion\": 1,"));
        assert!(written.ends_with("}\n"));
        assert!(written.contains("\"color\": \"#FFA500\""));

        assert_eq!(store(&dir).load().unwrap(), config);
    }

    #[test]
    fn minimal_document_gets_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"{"schemaVersion": 1, "repositories": [{"name": "api", "alias": "a"}]}"#,
        )
        .unwrap();
        let config = store(&dir).load().unwrap();
        assert_eq!(config.repositories[0].env_file, ".env");
        assert_eq!(config.workspace.name, "default");
    }
}
