use secrecy::SecretString;
use std::sync::Arc;

use super::{ProviderError, RelationalStore};
use crate::error::{Error, Result};
use crate::model::{ProfilePatch, ProfileRow};

/// Relational store wrapper for the `profiles` table.
#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn RelationalStore>,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    pub async fn read(&self, access_token: &SecretString, id: &str) -> Result<ProfileRow> {
        self.store
            .read_profile(access_token, id)
            .await
            .map_err(map_error)?
            .ok_or(Error::NotFound)
    }

    /// Returns the row from the write acknowledgment.
    pub async fn update(
        &self,
        access_token: &SecretString,
        id: &str,
        patch: &ProfilePatch,
    ) -> Result<ProfileRow> {
        self.store
            .update_profile(access_token, id, patch)
            .await
            .map_err(map_error)?
            .ok_or(Error::NotFound)
    }
}

fn map_error(err: ProviderError) -> Error {
    match err {
        ProviderError::NotFound => Error::NotFound,
        ProviderError::Rejected { message, .. } => Error::Provider(message),
        ProviderError::Unavailable(message) => Error::Transport(message),
    }
}
