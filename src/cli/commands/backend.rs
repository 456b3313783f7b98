//! Connection and storage settings shared by every subcommand.

use anyhow::{Context, anyhow};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::OrchestratorConfig;
use crate::gateway::KeyLayout;

pub const ARG_SUPABASE_URL: &str = "supabase-url";
pub const ARG_SUPABASE_ANON_KEY: &str = "supabase-anon-key";
pub const ARG_DSN: &str = "dsn";
pub const ARG_SITE_URL: &str = "site-url";
pub const ARG_AVATARS_BUCKET: &str = "avatars-bucket";
pub const ARG_AVATAR_KEY_LAYOUT: &str = "avatar-key-layout";
pub const ARG_AVATAR_MAX_BYTES: &str = "avatar-max-bytes";
pub const ARG_ACCESS_TOKEN: &str = "access-token";

#[derive(Debug, Clone)]
pub struct Options {
    pub supabase_url: String,
    pub supabase_anon_key: SecretString,
    pub dsn: Option<String>,
    pub site_url: String,
    pub avatars_bucket: String,
    pub key_layout: KeyLayout,
    pub avatar_max_bytes: usize,
    pub access_token: Option<SecretString>,
}

impl Options {
    /// Parse backend arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the Supabase URL or anon key is missing, or the key
    /// layout is unknown.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("missing required argument: --{id}"))
        };
        let read_optional = |id: &str| -> Option<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let key_layout = read_required(ARG_AVATAR_KEY_LAYOUT)?
            .parse::<KeyLayout>()
            .map_err(|e| anyhow!(e))?;

        Ok(Self {
            supabase_url: read_required(ARG_SUPABASE_URL)?,
            supabase_anon_key: SecretString::from(read_required(ARG_SUPABASE_ANON_KEY)?),
            dsn: read_optional(ARG_DSN),
            site_url: read_required(ARG_SITE_URL)?,
            avatars_bucket: read_required(ARG_AVATARS_BUCKET)?,
            key_layout,
            avatar_max_bytes: matches
                .get_one::<usize>(ARG_AVATAR_MAX_BYTES)
                .copied()
                .context("missing required argument: --avatar-max-bytes")?,
            access_token: read_optional(ARG_ACCESS_TOKEN).map(SecretString::from),
        })
    }

    #[must_use]
    pub fn config(&self) -> OrchestratorConfig {
        OrchestratorConfig::new(&self.site_url)
            .with_avatars_bucket(self.avatars_bucket.clone())
            .with_key_layout(self.key_layout)
            .with_avatar_max_bytes(self.avatar_max_bytes)
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SUPABASE_URL)
                .long(ARG_SUPABASE_URL)
                .help("Supabase project URL, example: https://<project>.supabase.co")
                .env("ROOMIE_SUPABASE_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_SUPABASE_ANON_KEY)
                .long(ARG_SUPABASE_ANON_KEY)
                .help("Supabase anon (public) API key")
                .env("ROOMIE_SUPABASE_ANON_KEY")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .long_help(
                    "Database connection string. When set, profile rows are read and written directly instead of through the Supabase REST API.",
                )
                .env("ROOMIE_DSN")
                .global(true),
        )
        .arg(
            Arg::new(ARG_SITE_URL)
                .long(ARG_SITE_URL)
                .help("Site URL used for confirmation and password reset links")
                .env("ROOMIE_SITE_URL")
                .default_value("http://localhost:3000")
                .global(true),
        )
        .arg(
            Arg::new(ARG_AVATARS_BUCKET)
                .long(ARG_AVATARS_BUCKET)
                .help("Storage bucket holding avatar images")
                .env("ROOMIE_AVATARS_BUCKET")
                .default_value("avatars")
                .global(true),
        )
        .arg(
            Arg::new(ARG_AVATAR_KEY_LAYOUT)
                .long(ARG_AVATAR_KEY_LAYOUT)
                .help("Avatar object key layout: flat ({id}-{token}.ext) or scoped ({id}/{token}.ext)")
                .env("ROOMIE_AVATAR_KEY_LAYOUT")
                .default_value("flat")
                .value_parser(["flat", "scoped"])
                .global(true),
        )
        .arg(
            Arg::new(ARG_AVATAR_MAX_BYTES)
                .long(ARG_AVATAR_MAX_BYTES)
                .help("Largest accepted avatar upload in bytes")
                .env("ROOMIE_AVATAR_MAX_BYTES")
                .default_value("5242880")
                .value_parser(clap::value_parser!(usize))
                .global(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN)
                .long(ARG_ACCESS_TOKEN)
                .help("Access token printed by `roomie signin`")
                .env("ROOMIE_ACCESS_TOKEN")
                .hide_env_values(true)
                .global(true),
        )
}
