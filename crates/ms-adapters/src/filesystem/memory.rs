//! In-memory filesystem adapter for testing.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use ms_core::{
    application::{ApplicationError, ports::Filesystem},
    error::MsResult,
};

/// In-memory filesystem for testing.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: BTreeMap<PathBuf, String>,
    directories: BTreeSet<PathBuf>,
}

impl MemoryFilesystemInner {
    fn add_dir_all(&mut self, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            self.directories.insert(current.clone());
        }
    }
}

impl MemoryFilesystem {
    /// Create a new empty memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory and all its parents (testing helper).
    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        if let Ok(mut inner) = self.inner.write() {
            inner.add_dir_all(path.as_ref());
        }
        self
    }

    /// A directory with a `.git` subdirectory.
    pub fn add_git_repo(&self, path: impl AsRef<Path>) -> &Self {
        self.add_dir(path.as_ref().join(".git"))
    }

    /// Create a file, adding its parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) -> &Self {
        let path = path.as_ref();
        if let Ok(mut inner) = self.inner.write() {
            if let Some(parent) = path.parent() {
                inner.add_dir_all(parent);
            }
            inner.files.insert(path.to_path_buf(), content.to_string());
        }
        self
    }

    /// Read a file's content (testing helper).
    pub fn read_file(&self, path: impl AsRef<Path>) -> Option<String> {
        let inner = self.inner.read().ok()?;
        inner.files.get(path.as_ref()).cloned()
    }

    /// List all files.
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|inner| inner.files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Filesystem for MemoryFilesystem {
    fn read_to_string(&self, path: &Path) -> MsResult<Option<String>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        Ok(inner.files.get(path).cloned())
    }

    fn write_atomic(&self, path: &Path, content: &str) -> MsResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;

        // Ensure parent exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !inner.directories.contains(parent) {
                return Err(ApplicationError::FilesystemError {
                    path: path.to_path_buf(),
                    reason: "Parent directory does not exist".into(),
                }
                .into());
            }
        }

        inner.files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> MsResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;
        let content = inner.files.get(from).cloned().ok_or_else(|| {
            ApplicationError::filesystem(from, "Failed to copy file: not found")
        })?;
        inner.files.insert(to.to_path_buf(), content);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner
            .read()
            .map(|inner| inner.files.contains_key(path) || inner.directories.contains(path))
            .unwrap_or(false)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner
            .read()
            .map(|inner| inner.directories.contains(path))
            .unwrap_or(false)
    }

    fn list_dirs(&self, path: &Path) -> MsResult<Vec<String>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        Ok(inner
            .directories
            .iter()
            .filter(|d| d.parent() == Some(path))
            .filter_map(|d| d.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_requires_parent() {
        let fs = MemoryFilesystem::new();
        assert!(fs.write_atomic(Path::new("/w/api/.env"), "A=1").is_err());

        fs.add_dir("/w/api");
        fs.write_atomic(Path::new("/w/api/.env"), "A=1").unwrap();
        assert_eq!(fs.read_file("/w/api/.env").as_deref(), Some("A=1"));
    }

    #[test]
    fn list_dirs_returns_immediate_children() {
        let fs = MemoryFilesystem::new();
        fs.add_git_repo("/w/api").add_git_repo("/w/db").add_dir("/w/db/migrations");

        assert_eq!(fs.list_dirs(Path::new("/w")).unwrap(), ["api", "db"]);
        assert!(fs.is_dir(Path::new("/w/api/.git")));
    }

    #[test]
    fn copy_duplicates_content() {
        let fs = MemoryFilesystem::new();
        fs.add_file("/h/.zshrc", "x");
        fs.copy(Path::new("/h/.zshrc"), Path::new("/h/.zshrc.bak")).unwrap();
        assert_eq!(fs.read_file("/h/.zshrc.bak").as_deref(), Some("x"));
        assert!(fs.copy(Path::new("/h/none"), Path::new("/h/x")).is_err());
    }
}
