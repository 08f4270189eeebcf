//! Env Service - reads and edits each repository's env file and checks the
//! workspace env rules across all of them.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::{
    application::{ApplicationError, ports::Filesystem},
    domain::{
        EnvConflict, EnvMap, KeyMatch, MissingEnvPolicy, RepoConfig, RepoEnv, WorkspaceConfig,
        env,
    },
    error::MsResult,
};

/// Result of listing one repository's env file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvListing {
    Vars(EnvMap),
    /// File absent and the policy is not strict.
    Missing { path: PathBuf, policy: MissingEnvPolicy },
}

/// A key's value before `env set` changes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentValue {
    Set(String),
    Unset,
    FileMissing,
}

pub struct EnvService {
    fs: Arc<dyn Filesystem>,
    root: PathBuf,
}

impl EnvService {
    pub fn new(fs: Arc<dyn Filesystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    pub fn env_path(&self, repo: &RepoConfig) -> PathBuf {
        self.root.join(&repo.name).join(&repo.env_file)
    }

    /// Parsed env file, `None` when it does not exist.
    pub fn read(&self, repo: &RepoConfig) -> MsResult<Option<EnvMap>> {
        Ok(self
            .fs
            .read_to_string(&self.env_path(repo))?
            .map(|content| env::parse(&content)))
    }

    /// Env file contents for `env ls`, honoring the missing-file policy.
    pub fn list(&self, repo: &RepoConfig, policy: MissingEnvPolicy) -> MsResult<EnvListing> {
        let path = self.env_path(repo);
        match self.read(repo)? {
            Some(vars) => Ok(EnvListing::Vars(vars)),
            None if policy == MissingEnvPolicy::Strict => {
                Err(ApplicationError::EnvFileMissing { path }.into())
            }
            None => Ok(EnvListing::Missing { path, policy }),
        }
    }

    pub fn current_value(&self, repo: &RepoConfig, key: &str) -> MsResult<CurrentValue> {
        Ok(match self.read(repo)? {
            None => CurrentValue::FileMissing,
            Some(vars) => vars
                .get(key)
                .map_or(CurrentValue::Unset, |v| CurrentValue::Set(v.clone())),
        })
    }

    /// Write `key=value` into the repo's env file. Returns whether the
    /// file changed.
    #[instrument(skip(self, repo, value), fields(repo = %repo.name))]
    pub fn set(&self, repo: &RepoConfig, key: &str, value: &str) -> MsResult<bool> {
        env::validate_key(key)?;
        let path = self.env_path(repo);
        let content = self.fs.read_to_string(&path)?.unwrap_or_default();

        match env::update_key(&content, key, value) {
            Some(updated) => {
                self.fs.write_atomic(&path, &updated)?;
                info!(path = %path.display(), "Updated env key");
                Ok(true)
            }
            None => {
                debug!("Value unchanged");
                Ok(false)
            }
        }
    }

    /// Every repository's env in config order; missing files are empty.
    pub fn collect(&self, config: &WorkspaceConfig) -> MsResult<Vec<RepoEnv>> {
        config
            .repositories
            .iter()
            .map(|repo| {
                let vars = self.read(repo)?.unwrap_or_default();
                Ok(RepoEnv::new(repo.name.clone(), vars))
            })
            .collect()
    }

    /// Run every consistency rule. Whether conflicts fail the command is
    /// decided by the caller via [`env::enforce`].
    #[instrument(skip_all)]
    pub fn check(&self, config: &WorkspaceConfig) -> MsResult<Vec<EnvConflict>> {
        let envs = self.collect(config)?;
        let conflicts = env::find_conflicts(&config.env, &envs);
        debug!(count = conflicts.len(), "Env rules checked");
        Ok(conflicts)
    }

    /// Values in other repositories that are expected to equal `key`.
    pub fn related_values(
        &self,
        config: &WorkspaceConfig,
        repo: &RepoConfig,
        key: &str,
    ) -> MsResult<Vec<KeyMatch>> {
        let mut envs = Vec::new();
        for other in config.repositories.iter().filter(|r| r.name != repo.name) {
            if let Some(vars) = self.read(other)? {
                envs.push(RepoEnv::new(other.name.clone(), vars));
            }
        }
        Ok(env::find_matching_keys(&config.env, &envs, key))
    }
}
