use anyhow::Result;

use super::{connect, print_json, report, restore};
use crate::cli::commands::backend::Options;
use crate::validation::validate_display_name;

#[derive(Debug)]
pub enum Command {
    Show,
    Rename { display_name: String },
}

#[derive(Debug)]
pub struct Args {
    pub backend: Options,
    pub command: Command,
}

/// # Errors
/// Returns an error if the input is invalid, there is no valid session, or
/// the operation fails.
pub async fn execute(args: Args) -> Result<()> {
    precheck(&args.command).map_err(report)?;

    let orchestrator = connect(&args.backend).await?;
    let context = restore(&orchestrator, &args.backend).await?;

    let profile = match args.command {
        Command::Show => orchestrator.load_profile(&context).await,
        Command::Rename { display_name } => {
            orchestrator
                .update_display_name(&context, &display_name)
                .await
        }
    }
    .map_err(report)?;

    print_json(&profile)
}

/// Checks that need no session, run before anything touches the network.
fn precheck(command: &Command) -> crate::Result<()> {
    if let Command::Rename { display_name } = command {
        validate_display_name(display_name)?;
    }
    Ok(())
}
