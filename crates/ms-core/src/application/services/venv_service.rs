//! Per-repository virtualenvs managed with `uv`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    application::{
        ApplicationError,
        ports::{CommandRunner, CommandSpec, CommandStatus, Filesystem},
    },
    error::MsResult,
};

pub const VENV_DIR: &str = ".venv";
pub const DEFAULT_REQUIREMENTS: &str = "requirements.txt";

pub struct VenvService {
    runner: Arc<dyn CommandRunner>,
    fs: Arc<dyn Filesystem>,
}

impl VenvService {
    pub fn new(runner: Arc<dyn CommandRunner>, fs: Arc<dyn Filesystem>) -> Self {
        Self { runner, fs }
    }

    pub fn venv_path(dir: &Path) -> PathBuf {
        dir.join(VENV_DIR)
    }

    /// A venv counts as present once its interpreter exists.
    pub fn exists(&self, dir: &Path) -> bool {
        let venv = Self::venv_path(dir);
        self.fs.is_dir(&venv) && self.fs.exists(&venv.join("bin").join("python"))
    }

    fn ensure_uv(&self) -> MsResult<()> {
        if self.runner.is_available("uv") {
            return Ok(());
        }
        Err(ApplicationError::ToolNotFound {
            tool: "uv".into(),
            hint: "Please install uv.".into(),
        }
        .into())
    }

    /// `uv venv <dir>/.venv`.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn create(&self, dir: &Path) -> MsResult<()> {
        self.ensure_uv()?;
        let venv = Self::venv_path(dir);
        let spec = CommandSpec::new("uv")
            .cwd(dir)
            .arg("venv")
            .arg(venv.display().to_string());
        let out = self.runner.capture(&spec)?;
        if !out.success() {
            return Err(ApplicationError::command_failed(spec.display(), out.status, &out.stderr).into());
        }
        info!(venv = %venv.display(), "Venv created");
        Ok(())
    }

    /// Create the venv when missing, then install `requirements` into it.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn sync(&self, dir: &Path, requirements: &str) -> MsResult<CommandStatus> {
        self.ensure_uv()?;
        let req = dir.join(requirements);
        if !self.fs.exists(&req) {
            return Err(ApplicationError::RequirementsMissing { path: req }.into());
        }
        if !self.exists(dir) {
            self.create(dir)?;
        }
        let spec = CommandSpec::new("uv").cwd(dir).args([
            "pip".to_string(),
            "install".into(),
            "-r".into(),
            req.display().to_string(),
            "--python".into(),
            Self::venv_path(dir).display().to_string(),
        ]);
        self.runner.stream(&spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{CommandOutput, MockCommandRunner, MockFilesystem};

    #[test]
    fn missing_uv_is_an_error() {
        let mut runner = MockCommandRunner::new();
        runner.expect_is_available().return_const(false);
        let svc = VenvService::new(Arc::new(runner), Arc::new(MockFilesystem::new()));
        assert!(svc.create(Path::new("/w/db")).is_err());
    }

    #[test]
    fn sync_requires_requirements_file() {
        let mut runner = MockCommandRunner::new();
        runner.expect_is_available().return_const(true);
        runner.expect_stream().never();
        let mut fs = MockFilesystem::new();
        fs.expect_exists().return_const(false);

        let svc = VenvService::new(Arc::new(runner), Arc::new(fs));
        let err = svc.sync(Path::new("/w/db"), "requirements.txt").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Requirements file not found: /w/db/requirements.txt"
        );
    }

    #[test]
    fn sync_creates_missing_venv_first() {
        let mut runner = MockCommandRunner::new();
        runner.expect_is_available().return_const(true);
        runner
            .expect_capture()
            .withf(|s| s.args == ["venv", "/w/db/.venv"])
            .times(1)
            .returning(|_| Ok(CommandOutput::ok("")));
        runner
            .expect_stream()
            .withf(|s| s.args.first().map(String::as_str) == Some("pip"))
            .times(1)
            .returning(|_| Ok(CommandStatus::SUCCESS));
        let mut fs = MockFilesystem::new();
        fs.expect_exists()
            .returning(|p| p.ends_with("requirements.txt"));
        fs.expect_is_dir().return_const(false);

        let svc = VenvService::new(Arc::new(runner), Arc::new(fs));
        assert!(svc.sync(Path::new("/w/db"), "requirements.txt").unwrap().success());
    }
}
