use clap::{Arg, Command};

pub const CMD_SIGN_UP: &str = "signup";
pub const CMD_SIGN_IN: &str = "signin";
pub const CMD_SIGN_OUT: &str = "signout";
pub const CMD_RESET_PASSWORD: &str = "reset-password";

pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_NAME: &str = "name";

fn email() -> Arg {
    Arg::new(ARG_EMAIL)
        .short('e')
        .long(ARG_EMAIL)
        .help("Account email address")
        .required(true)
}

fn password() -> Arg {
    Arg::new(ARG_PASSWORD)
        .short('p')
        .long(ARG_PASSWORD)
        .help("Account password")
        .env("ROOMIE_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

#[must_use]
pub fn with_subcommands(command: Command) -> Command {
    command
        .subcommand(
            Command::new(CMD_SIGN_UP)
                .about("Create an account; a confirmation email is sent")
                .arg(email())
                .arg(password())
                .arg(
                    Arg::new(ARG_NAME)
                        .short('n')
                        .long(ARG_NAME)
                        .help("Display name (2-50 characters)")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new(CMD_SIGN_IN)
                .about("Sign in and print an access token")
                .arg(email())
                .arg(password()),
        )
        .subcommand(Command::new(CMD_SIGN_OUT).about("Revoke the current access token"))
        .subcommand(
            Command::new(CMD_RESET_PASSWORD)
                .about("Email a password reset link")
                .arg(email()),
        )
}
