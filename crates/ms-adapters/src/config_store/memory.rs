//! In-memory config store for testing.

use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
};

use ms_core::{
    application::{ApplicationError, ports::ConfigStore},
    domain::WorkspaceConfig,
    error::MsResult,
};

/// Thread-safe in-memory config store.
#[derive(Debug, Clone)]
pub struct MemoryConfigStore {
    location: PathBuf,
    inner: Arc<RwLock<Option<WorkspaceConfig>>>,
}

impl MemoryConfigStore {
    /// An empty store: `load` reports the config as missing.
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            inner: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_config(location: impl Into<PathBuf>, config: WorkspaceConfig) -> Self {
        let store = Self::new(location);
        if let Ok(mut inner) = store.inner.write() {
            *inner = Some(config);
        }
        store
    }

    /// Last saved config (testing helper).
    pub fn current(&self) -> Option<WorkspaceConfig> {
        self.inner.read().ok()?.clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn location(&self) -> PathBuf {
        self.location.clone()
    }

    fn exists(&self) -> bool {
        self.current().is_some()
    }

    fn load(&self) -> MsResult<WorkspaceConfig> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        inner.clone().ok_or_else(|| {
            ApplicationError::ConfigNotFound {
                path: self.location.clone(),
            }
            .into()
        })
    }

    fn save(&self, config: &WorkspaceConfig) -> MsResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;
        *inner = Some(config.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_reports_missing() {
        let store = MemoryConfigStore::new("/w/ms-config.json");
        assert!(!store.exists());
        assert!(store.load().is_err());

        store.save(&WorkspaceConfig::default()).unwrap();
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), WorkspaceConfig::default());
    }
}
