//! `ms prompt`: git segment for PS1 / PROMPT.

use ms_core::domain::PromptStyle;

use crate::{
    cli::{PromptArgs, PromptFormat},
    context::Context,
    error::CliResult,
};

/// Prints nothing outside a git repository.
pub fn execute(args: PromptArgs, ctx: &Context) -> CliResult<()> {
    if let Some(info) = ctx.git().prompt_info(ctx.root()) {
        ctx.output.data(&info.render(style(args.format)))?;
    }
    Ok(())
}

const fn style(format: PromptFormat) -> PromptStyle {
    match format {
        PromptFormat::Plain => PromptStyle::Plain,
        PromptFormat::Zsh => PromptStyle::Zsh,
        PromptFormat::Bash => PromptStyle::Bash,
    }
}
