//! Map validated CLI matches to an [`Action`].

use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;
use std::path::PathBuf;

use crate::cli::actions::{Action, account, avatar, profile};
use crate::cli::commands::{account as account_cmd, backend, profile as profile_cmd};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let backend = backend::Options::parse(matches)?;

    let required = |sub: &ArgMatches, id: &str| -> Result<String> {
        sub.get_one::<String>(id)
            .cloned()
            .with_context(|| format!("missing required argument: --{id}"))
    };

    let action = match matches.subcommand() {
        Some((account_cmd::CMD_SIGN_UP, sub)) => Action::Account(account::Args {
            backend,
            command: account::Command::SignUp {
                email: required(sub, account_cmd::ARG_EMAIL)?,
                password: SecretString::from(required(sub, account_cmd::ARG_PASSWORD)?),
                display_name: required(sub, account_cmd::ARG_NAME)?,
            },
        }),
        Some((account_cmd::CMD_SIGN_IN, sub)) => Action::Account(account::Args {
            backend,
            command: account::Command::SignIn {
                email: required(sub, account_cmd::ARG_EMAIL)?,
                password: SecretString::from(required(sub, account_cmd::ARG_PASSWORD)?),
            },
        }),
        Some((account_cmd::CMD_SIGN_OUT, _)) => Action::Account(account::Args {
            backend,
            command: account::Command::SignOut,
        }),
        Some((account_cmd::CMD_RESET_PASSWORD, sub)) => Action::Account(account::Args {
            backend,
            command: account::Command::ResetPassword {
                email: required(sub, account_cmd::ARG_EMAIL)?,
            },
        }),
        Some((profile_cmd::CMD_PROFILE, _)) => Action::Profile(profile::Args {
            backend,
            command: profile::Command::Show,
        }),
        Some((profile_cmd::CMD_RENAME, sub)) => Action::Profile(profile::Args {
            backend,
            command: profile::Command::Rename {
                display_name: required(sub, profile_cmd::ARG_NAME)?,
            },
        }),
        Some((profile_cmd::CMD_AVATAR, sub)) => {
            let command = match sub.subcommand() {
                Some((profile_cmd::CMD_AVATAR_UPLOAD, upload)) => avatar::Command::Upload {
                    path: upload.get_one::<String>(profile_cmd::ARG_PATH).map(PathBuf::from),
                    content_type: upload
                        .get_one::<String>(profile_cmd::ARG_CONTENT_TYPE)
                        .cloned(),
                },
                Some((profile_cmd::CMD_AVATAR_DELETE, _)) => avatar::Command::Delete,
                _ => return Err(anyhow!("unknown avatar subcommand")),
            };
            Action::Avatar(avatar::Args { backend, command })
        }
        Some((other, _)) => return Err(anyhow!("unknown subcommand: {other}")),
        None => return Err(anyhow!("missing subcommand")),
    };

    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    fn dispatch(args: &[&str]) -> Result<Action> {
        let mut argv = vec![
            "roomie",
            "--supabase-url",
            "https://project.supabase.co",
            "--supabase-anon-key",
            "anon",
        ];
        argv.extend_from_slice(args);
        let matches = commands::new().try_get_matches_from(argv)?;
        handler(&matches)
    }

    #[test]
    fn signup_maps_to_account_action() -> Result<()> {
        let action = dispatch(&[
            "signup",
            "--email",
            "a@b.com",
            "--password",
            "pw123456",
            "--name",
            "Max",
        ])?;
        let Action::Account(account::Args {
            command:
                account::Command::SignUp {
                    email,
                    password,
                    display_name,
                },
            ..
        }) = &action
        else {
            anyhow::bail!("unexpected action: {action:?}");
        };
        assert_eq!(email, "a@b.com");
        assert_eq!(password.expose_secret(), "pw123456");
        assert_eq!(display_name, "Max");
        Ok(())
    }

    #[test]
    fn avatar_upload_without_path() -> Result<()> {
        let action = dispatch(&["avatar", "upload"])?;
        assert!(matches!(
            action,
            Action::Avatar(avatar::Args {
                command: avatar::Command::Upload { path: None, .. },
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn rename_and_delete() -> Result<()> {
        assert!(matches!(
            dispatch(&["rename", "Maxi"])?,
            Action::Profile(profile::Args {
                command: profile::Command::Rename { .. },
                ..
            })
        ));
        assert!(matches!(
            dispatch(&["avatar", "delete"])?,
            Action::Avatar(avatar::Args {
                command: avatar::Command::Delete,
                ..
            })
        ));
        Ok(())
    }
}
