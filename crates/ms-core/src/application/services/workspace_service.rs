//! Workspace Service - config lifecycle and preflight.
//!
//! The workspace root is the directory holding `ms-config.json`; every
//! configured repository is an immediate child of it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        ApplicationError,
        ports::{ConfigStore, Filesystem},
    },
    domain::{RepoConfig, WorkspaceConfig},
    error::MsResult,
};

pub struct WorkspaceService {
    store: Arc<dyn ConfigStore>,
    fs: Arc<dyn Filesystem>,
    root: PathBuf,
}

impl WorkspaceService {
    pub fn new(store: Arc<dyn ConfigStore>, fs: Arc<dyn Filesystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            fs,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.store.location()
    }

    pub fn repo_dir(&self, repo: &RepoConfig) -> PathBuf {
        self.root.join(&repo.name)
    }

    pub fn config_exists(&self) -> bool {
        self.store.exists()
    }

    /// Load the config. When `require` is false a missing file yields the
    /// default document so `setup` can start from scratch.
    pub fn load(&self, require: bool) -> MsResult<WorkspaceConfig> {
        if !require && !self.store.exists() {
            debug!("No config yet, starting from defaults");
            return Ok(WorkspaceConfig::default());
        }
        self.store.load()
    }

    /// Validate and persist.
    #[instrument(skip_all, fields(repos = config.repositories.len()))]
    pub fn save(&self, config: &WorkspaceConfig) -> MsResult<()> {
        config.validate()?;
        self.store.save(config)?;
        info!(path = %self.store.location().display(), "Saved workspace config");
        Ok(())
    }

    fn is_git_repo(&self, dir: &Path) -> bool {
        self.fs.is_dir(dir) && self.fs.is_dir(&dir.join(".git"))
    }

    /// Checks run before every workspace command: the config exists and
    /// parses, every repository is a git checkout, aliases are unique.
    #[instrument(skip(self))]
    pub fn preflight(&self) -> MsResult<WorkspaceConfig> {
        let config = self.store.load()?;

        for repo in &config.repositories {
            if !self.is_git_repo(&self.repo_dir(repo)) {
                warn!(repo = %repo.name, "Configured repo missing");
                return Err(ApplicationError::RepoMissing {
                    name: repo.name.clone(),
                }
                .into());
            }
        }
        config.validate()?;

        debug!(repos = config.repositories.len(), "Preflight passed");
        Ok(config)
    }

    /// Git checkouts directly under the root that are not configured yet.
    pub fn discover_candidates(&self, config: &WorkspaceConfig) -> MsResult<Vec<String>> {
        let mut found: Vec<String> = self
            .fs
            .list_dirs(&self.root)?
            .into_iter()
            .filter(|name| !name.starts_with('.'))
            .filter(|name| config.repositories.iter().all(|r| &r.name != name))
            .filter(|name| self.is_git_repo(&self.root.join(name)))
            .collect();
        found.sort();
        Ok(found)
    }

    /// Problems `setup` reports after saving. Empty means healthy.
    pub fn health_check(&self, config: &WorkspaceConfig) -> Vec<String> {
        let mut problems: Vec<String> = config
            .repositories
            .iter()
            .filter(|r| !self.is_git_repo(&self.repo_dir(r)))
            .map(|r| format!("Configured repo '{}' missing or not a git repo.", r.name))
            .collect();
        if let Err(e) = config.validate() {
            problems.push(e.to_string());
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockConfigStore, MockFilesystem};
    use crate::domain::DomainError;
    use crate::error::MsError;

    fn config() -> WorkspaceConfig {
        let mut cfg = WorkspaceConfig::default();
        cfg.add_repo(RepoConfig::new("api", "a")).unwrap();
        cfg
    }

    fn service(store: MockConfigStore, fs: MockFilesystem) -> WorkspaceService {
        WorkspaceService::new(Arc::new(store), Arc::new(fs), "/w")
    }

    #[test]
    fn load_without_requirement_defaults_when_missing() {
        let mut store = MockConfigStore::new();
        store.expect_exists().return_const(false);
        store.expect_load().never();
        let svc = service(store, MockFilesystem::new());
        assert_eq!(svc.load(false).unwrap(), WorkspaceConfig::default());
    }

    #[test]
    fn preflight_reports_missing_repo() {
        let mut store = MockConfigStore::new();
        store.expect_load().returning(|| Ok(config()));
        let mut fs = MockFilesystem::new();
        fs.expect_is_dir().return_const(false);

        let err = service(store, fs).preflight().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configured repo 'api' missing or not a git repo. Run: ms setup."
        );
    }

    #[test]
    fn preflight_passes_for_git_checkouts() {
        let mut store = MockConfigStore::new();
        store.expect_load().returning(|| Ok(config()));
        let mut fs = MockFilesystem::new();
        fs.expect_is_dir().return_const(true);

        let cfg = service(store, fs).preflight().unwrap();
        assert_eq!(cfg.repositories.len(), 1);
    }

    #[test]
    fn save_refuses_invalid_config() {
        let mut store = MockConfigStore::new();
        store.expect_save().never();
        let mut cfg = config();
        cfg.repositories.push(RepoConfig::new("web", "a"));

        let err = service(store, MockFilesystem::new()).save(&cfg).unwrap_err();
        assert!(matches!(
            err,
            MsError::Domain(DomainError::DuplicateAlias { .. })
        ));
    }

    #[test]
    fn candidates_skip_configured_and_non_git_dirs() {
        let mut fs = MockFilesystem::new();
        fs.expect_list_dirs().returning(|_| {
            Ok(vec![
                "web".into(),
                "api".into(),
                "docs".into(),
                ".cache".into(),
                "db".into(),
            ])
        });
        fs.expect_is_dir()
            .returning(|p| !p.starts_with("/w/docs"));

        let found = service(MockConfigStore::new(), fs)
            .discover_candidates(&config())
            .unwrap();
        assert_eq!(found, ["db", "web"]);
    }
}
