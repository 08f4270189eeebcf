//! `ms tf`: terraform with the terminal attached.

use tracing::instrument;

use ms_core::application::TerraformAction;

use crate::{
    cli::{TfAction, TfArgs},
    context::{Context, forward},
    error::CliResult,
};

#[instrument(skip_all, fields(action = ?args.action))]
pub fn execute(args: TfArgs, ctx: &Context) -> CliResult<()> {
    let action = action(args.action);
    let dir = args.dir.unwrap_or_else(|| ctx.root().to_path_buf());

    let terraform = ctx.terraform();
    terraform.ensure_available()?;
    if action.is_destructive() {
        ctx.confirm_destructive(&format!(
            "terraform {} in {} changes real infrastructure.",
            action.as_str(),
            dir.display()
        ))?;
    }
    forward(terraform.run(&dir, action, &args.extra)?)
}

const fn action(action: TfAction) -> TerraformAction {
    match action {
        TfAction::Init => TerraformAction::Init,
        TfAction::Plan => TerraformAction::Plan,
        TfAction::Apply => TerraformAction::Apply,
        TfAction::Destroy => TerraformAction::Destroy,
    }
}
