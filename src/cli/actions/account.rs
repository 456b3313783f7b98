use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::warn;

use super::{connect, print_json, report, restore};
use crate::SessionContext;
use crate::cli::commands::backend::Options;

#[derive(Debug)]
pub enum Command {
    SignUp {
        email: String,
        password: SecretString,
        display_name: String,
    },
    SignIn {
        email: String,
        password: SecretString,
    },
    SignOut,
    ResetPassword {
        email: String,
    },
}

#[derive(Debug)]
pub struct Args {
    pub backend: Options,
    pub command: Command,
}

/// # Errors
/// Returns an error if the backend cannot be reached or the operation fails.
pub async fn execute(args: Args) -> Result<()> {
    let orchestrator = connect(&args.backend).await?;

    match args.command {
        Command::SignUp {
            email,
            password,
            display_name,
        } => {
            let context = SessionContext::new();
            let outcome = orchestrator
                .sign_up(&context, &email, &password, &display_name)
                .await
                .map_err(report)?;
            print_json(&outcome)
        }
        Command::SignIn { email, password } => {
            let context = SessionContext::new();
            let identity = orchestrator
                .sign_in(&context, &email, &password)
                .await
                .map_err(report)?;

            let profile = match orchestrator.load_profile(&context).await {
                Ok(profile) => Some(profile),
                Err(err) => {
                    warn!("signed in but the profile could not be loaded: {err}");
                    None
                }
            };
            let access_token = context
                .session()
                .map(|session| session.access_token.expose_secret().to_string());

            print_json(&json!({
                "identity": identity,
                "access_token": access_token,
                "profile": profile,
            }))
        }
        Command::SignOut => {
            let context = restore(&orchestrator, &args.backend).await?;
            orchestrator.sign_out(&context).await.map_err(report)?;
            print_json(&context.state())
        }
        Command::ResetPassword { email } => {
            let context = SessionContext::new();
            orchestrator
                .request_password_reset(&context, &email)
                .await
                .map_err(report)?;
            print_json(&context.state())
        }
    }
}
