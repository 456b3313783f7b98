//! How much `roomie` logs to stderr.
//!
//! Command results go to stdout, so raising verbosity never changes what a
//! script reads.

use clap::{Arg, ArgAction, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Names accepted in `ROOMIE_LOG_LEVEL`, indexed by `-v` count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// A level name or a `-v` count; `0` keeps only errors.
fn parse_level(level: &str) -> Result<u8, String> {
    let level = level.trim().to_ascii_lowercase();
    if let Ok(count) = level.parse::<u8>()
        && usize::from(count) < LEVEL_NAMES.len()
    {
        return Ok(count);
    }

    LEVEL_NAMES
        .iter()
        .position(|name| *name == level)
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| {
            format!(
                "unknown log level '{level}', expected one of: {}",
                LEVEL_NAMES.join(", ")
            )
        })
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_level)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log provider calls and profile writes to stderr; repeat for more (-vvvv = trace)")
            .env("ROOMIE_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
