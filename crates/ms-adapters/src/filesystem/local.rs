//! Local filesystem adapter using std::fs.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::trace;

use ms_core::{
    application::{ApplicationError, ports::Filesystem},
    error::{MsError, MsResult},
};

/// Production filesystem implementation using `std::fs`.
#[derive(Debug, Clone, Copy)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    /// Create a new local filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for LocalFilesystem {
    fn read_to_string(&self, path: &Path) -> MsResult<Option<String>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io_error(path, e, "read file")),
        }
    }

    fn write_atomic(&self, path: &Path, content: &str) -> MsResult<()> {
        write_atomic(path, content)
    }

    fn copy(&self, from: &Path, to: &Path) -> MsResult<()> {
        fs::copy(from, to)
            .map(|_| ())
            .map_err(|e| map_io_error(to, e, "copy file"))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dirs(&self, path: &Path) -> MsResult<Vec<String>> {
        let entries = fs::read_dir(path).map_err(|e| map_io_error(path, e, "read directory"))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| map_io_error(path, e, "read directory"))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Write through a temp file in the target's directory and rename it over
/// the target. The target's permissions carry over when it already exists.
/// A symlink is followed so the file it points at is replaced, not the link.
pub(crate) fn write_atomic(path: &Path, content: &str) -> MsResult<()> {
    let resolved = resolve_symlink(path);
    let path = resolved.as_path();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| map_io_error(path, e, "create temp file"))?;
    tmp.write_all(content.as_bytes())
        .and_then(|()| tmp.flush())
        .map_err(|e| map_io_error(path, e, "write file"))?;

    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())
            .map_err(|e| map_io_error(path, e, "set permissions"))?;
    }

    tmp.persist(path)
        .map_err(|e| map_io_error(path, e.error, "replace file"))?;
    trace!(path = %path.display(), bytes = content.len(), "Wrote file atomically");
    Ok(())
}

fn resolve_symlink(path: &Path) -> PathBuf {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => fs::canonicalize(path)
            .or_else(|_| {
                // Dangling link: write where it points.
                fs::read_link(path).map(|target| match path.parent() {
                    Some(parent) => parent.join(target),
                    None => target,
                })
            })
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

pub(crate) fn map_io_error(path: &Path, e: io::Error, operation: &str) -> MsError {
    ApplicationError::FilesystemError {
        path: path.to_path_buf(),
        reason: format!("Failed to {}: {}", operation, e),
    }
    .into()
}
