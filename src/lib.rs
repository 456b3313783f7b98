//! # Roomie (Profile & Credential Reconciliation)
//!
//! `roomie` keeps three independently owned resources consistent: the identity
//! provider's session, the `profiles` row, and the avatar object in the media
//! store.
//!
//! ## Layers
//!
//! - [`validation`]: cheap synchronous field checks, callable per keystroke.
//! - [`gateway`]: the collaborator traits plus thin gateways that map every
//!   provider failure into the closed [`Error`] taxonomy.
//! - [`backend`]: concrete collaborators (Supabase REST, Postgres via `sqlx`,
//!   and in-memory fakes).
//! - [`orchestrator`]: the composite flows (sign-up, sign-in, reset, profile
//!   load and update, avatar upload and delete).
//!
//! ## Avatar Invariant
//!
//! At every externally observable instant a profile's `avatar_ref` is either
//! `None` or names an object that exists in the media store. Uploads write the
//! object before the reference; deletes clear the reference before the object.
//! Superseded objects are reclaimed best-effort and leaks are only logged.

pub mod backend;
pub mod cli;
pub mod error;
pub mod gateway;
pub mod model;
pub mod orchestrator;
pub mod validation;

pub use error::{Error, Result, ValidationError};
pub use orchestrator::{Orchestrator, OrchestratorConfig, SessionContext};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
