//! `terraform` shortcuts. These run in any directory and need no workspace
//! config.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::instrument;

use crate::{
    application::{
        ApplicationError,
        ports::{CommandRunner, CommandSpec, CommandStatus},
    },
    error::MsResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerraformAction {
    Init,
    Plan,
    Apply,
    Destroy,
}

impl TerraformAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Plan => "plan",
            Self::Apply => "apply",
            Self::Destroy => "destroy",
        }
    }

    /// `apply` and `destroy` change real infrastructure.
    pub const fn is_destructive(&self) -> bool {
        matches!(self, Self::Apply | Self::Destroy)
    }
}

impl fmt::Display for TerraformAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct TerraformService {
    runner: Arc<dyn CommandRunner>,
}

impl TerraformService {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub fn ensure_available(&self) -> MsResult<()> {
        if self.runner.is_available("terraform") {
            return Ok(());
        }
        Err(ApplicationError::ToolNotFound {
            tool: "terraform".into(),
            hint: "Install it: https://developer.hashicorp.com/terraform/install".into(),
        }
        .into())
    }

    #[instrument(skip(self, extra), fields(dir = %dir.display()))]
    pub fn run(&self, dir: &Path, action: TerraformAction, extra: &[String]) -> MsResult<CommandStatus> {
        self.ensure_available()?;
        let spec = CommandSpec::new("terraform")
            .cwd(dir)
            .arg(action.as_str())
            .args(extra.iter().cloned());
        self.runner.stream(&spec)
    }
}
