//! Collaborator traits and the gateways wrapping them.
//!
//! Flow Overview:
//! 1) A backend implements one of the collaborator traits and reports failures
//!    as a loosely-typed [`ProviderError`].
//! 2) The gateway for that collaborator maps each failure into the closed
//!    [`crate::Error`] kinds, depending on which operation failed.
//! 3) The orchestrator only ever sees gateway results.

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use thiserror::Error;

use crate::model::{AuthSession, Identity, ProfilePatch, ProfileRow, Registration};

mod media;
mod profile;
mod session;

pub use media::{KeyLayout, MediaStore};
pub use profile::ProfileRepository;
pub use session::SessionGateway;

/// Failure reported by a collaborator, before classification.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider understood the request and refused it.
    #[error("rejected{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Rejected {
        status: Option<u16>,
        message: String,
    },
    #[error("not found")]
    NotFound,
    /// Network failure, timeout, rate limit, or a server-side error.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    #[must_use]
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// The external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        metadata: &Value,
        confirm_redirect_url: &str,
    ) -> Result<Registration, ProviderError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, ProviderError>;

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), ProviderError>;

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> Result<(), ProviderError>;

    /// `None` when the token no longer maps to a live session.
    async fn current_user(
        &self,
        access_token: &SecretString,
    ) -> Result<Option<Identity>, ProviderError>;
}

/// The external object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        access_token: &SecretString,
        bucket: &str,
        key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), ProviderError>;

    /// Public URL for a key. No network call, no existence check.
    fn public_url(&self, bucket: &str, key: &str) -> String;

    async fn delete_object(
        &self,
        access_token: &SecretString,
        bucket: &str,
        key: &str,
    ) -> Result<(), ProviderError>;
}

/// The external relational store holding the `profiles` table.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn read_profile(
        &self,
        access_token: &SecretString,
        id: &str,
    ) -> Result<Option<ProfileRow>, ProviderError>;

    /// Apply the patch and return the row as written, or `None` if no row
    /// matched `id`.
    async fn update_profile(
        &self,
        access_token: &SecretString,
        id: &str,
        patch: &ProfilePatch,
    ) -> Result<Option<ProfileRow>, ProviderError>;
}
