use crate::cli::actions::{Action, account, avatar, profile};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Account(args) => account::execute(args).await,
        Action::Profile(args) => profile::execute(args).await,
        Action::Avatar(args) => avatar::execute(args).await,
    }
}
