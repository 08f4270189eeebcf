//! `docker compose` lifecycle shortcuts.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::instrument;

use crate::{
    application::{
        ApplicationError,
        ports::{CommandRunner, CommandSpec, CommandStatus, Filesystem},
    },
    error::MsResult,
};

const COMPOSE_FILES: [&str; 2] = ["docker-compose.yml", "docker-compose.yaml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeAction {
    Up { detach: bool, build: bool },
    Down { volumes: bool },
    Build,
}

impl ComposeAction {
    pub fn args(&self) -> Vec<&'static str> {
        match *self {
            Self::Up { detach, build } => {
                let mut args = vec!["up"];
                if detach {
                    args.push("-d");
                }
                if build {
                    args.push("--build");
                }
                args
            }
            Self::Down { volumes } => {
                if volumes {
                    vec!["down", "-v"]
                } else {
                    vec!["down"]
                }
            }
            Self::Build => vec!["build"],
        }
    }

    /// Removing volumes deletes data.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::Down { volumes: true })
    }
}

impl fmt::Display for ComposeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args().join(" "))
    }
}

pub struct ComposeService {
    runner: Arc<dyn CommandRunner>,
    fs: Arc<dyn Filesystem>,
}

impl ComposeService {
    pub fn new(runner: Arc<dyn CommandRunner>, fs: Arc<dyn Filesystem>) -> Self {
        Self { runner, fs }
    }

    pub fn ensure_available(&self) -> MsResult<()> {
        if self.runner.is_available("docker") {
            return Ok(());
        }
        Err(ApplicationError::ToolNotFound {
            tool: "docker".into(),
            hint: "Is Docker installed?".into(),
        }
        .into())
    }

    pub fn compose_file(&self, dir: &Path) -> Option<PathBuf> {
        COMPOSE_FILES
            .iter()
            .map(|f| dir.join(f))
            .find(|p| self.fs.exists(p))
    }

    #[instrument(skip(self), fields(dir = %dir.display(), action = %action))]
    pub fn run(&self, dir: &Path, action: ComposeAction) -> MsResult<CommandStatus> {
        if self.compose_file(dir).is_none() {
            return Err(ApplicationError::ComposeFileMissing {
                path: dir.to_path_buf(),
            }
            .into());
        }
        let spec = CommandSpec::new("docker")
            .cwd(dir)
            .arg("compose")
            .args(action.args());
        self.runner.stream(&spec)
    }
}
