//! Shell Service - installs and removes the `ms` block in a startup file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    application::ports::Filesystem,
    domain::{ShellKind, StartupFileEdit, shell},
    error::MsResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellChange {
    /// The file already had exactly this content; nothing was written.
    Unchanged,
    Written {
        edit: StartupFileEdit,
        /// Copy of the previous file, absent when the file was new.
        backup: Option<PathBuf>,
    },
}

pub struct ShellService {
    fs: Arc<dyn Filesystem>,
}

impl ShellService {
    pub fn new(fs: Arc<dyn Filesystem>) -> Self {
        Self { fs }
    }

    /// `<file>.ms-backup-<stamp>`.
    pub fn backup_path(file: &Path, stamp: &str) -> PathBuf {
        let mut name = file.as_os_str().to_os_string();
        name.push(format!(".ms-backup-{stamp}"));
        PathBuf::from(name)
    }

    fn apply(&self, file: &Path, edit: StartupFileEdit, stamp: &str) -> MsResult<ShellChange> {
        if !edit.has_changes() {
            return Ok(ShellChange::Unchanged);
        }
        let backup = if self.fs.exists(file) {
            let path = Self::backup_path(file, stamp);
            self.fs.copy(file, &path)?;
            Some(path)
        } else {
            None
        };
        self.fs.write_atomic(file, &edit.modified)?;
        info!(file = %file.display(), "Startup file updated");
        Ok(ShellChange::Written { edit, backup })
    }

    /// Insert or refresh the integration block.
    #[instrument(skip(self, stamp), fields(file = %file.display()))]
    pub fn install(
        &self,
        file: &Path,
        kind: ShellKind,
        (os, arch): (&str, &str),
        stamp: &str,
    ) -> MsResult<ShellChange> {
        let content = self.fs.read_to_string(file)?.unwrap_or_default();
        let block = shell::render_block(kind, os, arch);
        let edit = shell::install(&content, &block)?;
        self.apply(file, edit, stamp)
    }

    #[instrument(skip(self, stamp), fields(file = %file.display()))]
    pub fn uninstall(&self, file: &Path, stamp: &str) -> MsResult<ShellChange> {
        let Some(content) = self.fs.read_to_string(file)? else {
            return Ok(ShellChange::Unchanged);
        };
        let edit = shell::uninstall(&content)?;
        self.apply(file, edit, stamp)
    }

    pub fn is_installed(&self, file: &Path) -> MsResult<bool> {
        Ok(self
            .fs
            .read_to_string(file)?
            .is_some_and(|c| shell::has_block(&c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockFilesystem;

    #[test]
    fn backup_name_appends_stamp() {
        assert_eq!(
            ShellService::backup_path(Path::new("/home/u/.zshrc"), "20260101120000"),
            PathBuf::from("/home/u/.zshrc.ms-backup-20260101120000")
        );
    }

    #[test]
    fn new_file_is_written_without_backup() {
        let mut fs = MockFilesystem::new();
        fs.expect_read_to_string().returning(|_| Ok(None));
        fs.expect_exists().return_const(false);
        fs.expect_copy().never();
        fs.expect_write_atomic()
            .withf(|_, c| c.contains(shell::BLOCK_START))
            .times(1)
            .returning(|_, _| Ok(()));

        let change = ShellService::new(Arc::new(fs))
            .install(Path::new("/h/.bashrc"), ShellKind::Bash, ("linux", "x86_64"), "s")
            .unwrap();
        assert!(matches!(change, ShellChange::Written { backup: None, .. }));
    }

    #[test]
    fn up_to_date_file_is_left_alone() {
        let installed = shell::render_block(ShellKind::Bash, "linux", "x86_64");
        let mut fs = MockFilesystem::new();
        fs.expect_read_to_string()
            .returning(move |_| Ok(Some(installed.clone())));
        fs.expect_write_atomic().never();
        fs.expect_copy().never();

        let change = ShellService::new(Arc::new(fs))
            .install(Path::new("/h/.bashrc"), ShellKind::Bash, ("linux", "x86_64"), "s")
            .unwrap();
        assert_eq!(change, ShellChange::Unchanged);
    }

    #[test]
    fn existing_file_is_backed_up_before_write() {
        let mut fs = MockFilesystem::new();
        fs.expect_read_to_string()
            .returning(|_| Ok(Some("export A=1\n".into())));
        fs.expect_exists().return_const(true);
        fs.expect_copy()
            .withf(|from, to| {
                from == Path::new("/h/.zshrc") && to == Path::new("/h/.zshrc.ms-backup-s")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        fs.expect_write_atomic().times(1).returning(|_, _| Ok(()));

        let change = ShellService::new(Arc::new(fs))
            .install(Path::new("/h/.zshrc"), ShellKind::Zsh, ("macos", "aarch64"), "s")
            .unwrap();
        let ShellChange::Written { edit, backup } = change else {
            panic!("expected a write");
        };
        assert!(backup.is_some());
        assert!(edit.modified.contains("/opt/homebrew/share/zsh/site-functions"));
    }

    #[test]
    fn uninstall_missing_file_is_noop() {
        let mut fs = MockFilesystem::new();
        fs.expect_read_to_string().returning(|_| Ok(None));
        let change = ShellService::new(Arc::new(fs))
            .uninstall(Path::new("/h/.zshrc"), "s")
            .unwrap();
        assert_eq!(change, ShellChange::Unchanged);
    }
}
