use clap::{Arg, Command};

pub const CMD_PROFILE: &str = "profile";
pub const CMD_RENAME: &str = "rename";
pub const CMD_AVATAR: &str = "avatar";
pub const CMD_AVATAR_UPLOAD: &str = "upload";
pub const CMD_AVATAR_DELETE: &str = "delete";

pub const ARG_NAME: &str = "name";
pub const ARG_PATH: &str = "path";
pub const ARG_CONTENT_TYPE: &str = "content-type";

#[must_use]
pub fn with_subcommands(command: Command) -> Command {
    command
        .subcommand(Command::new(CMD_PROFILE).about("Show the signed-in profile"))
        .subcommand(
            Command::new(CMD_RENAME)
                .about("Change the display name")
                .arg(
                    Arg::new(ARG_NAME)
                        .help("New display name (2-50 characters)")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new(CMD_AVATAR)
                .about("Manage the profile picture")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new(CMD_AVATAR_UPLOAD)
                        .about("Replace the avatar with an image file")
                        .arg(Arg::new(ARG_PATH).help("Image file to upload"))
                        .arg(
                            Arg::new(ARG_CONTENT_TYPE)
                                .long(ARG_CONTENT_TYPE)
                                .help("Override the content type guessed from the file extension"),
                        ),
                )
                .subcommand(Command::new(CMD_AVATAR_DELETE).about("Remove the avatar")),
        )
}
