//! Avatar replacement and removal.
//!
//! Upload: read the current row, write a new object under a fresh key, point
//! the row at it, then reclaim the previous object.
//! Delete: clear the row first, then reclaim the object.
//!
//! The row never references an object that was not successfully written. The
//! reverse is tolerated: a failed reclaim leaves an unreferenced object behind
//! and is only logged.

use secrecy::SecretString;
use tracing::{debug, info, instrument, warn};

use super::{Lane, Orchestrator, SessionContext};
use crate::error::{Error, Result};
use crate::model::{AvatarFile, Profile, ProfilePatch};
use crate::validation::validate_avatar;

impl Orchestrator {
    /// Replace the signed-in user's avatar with `file`.
    ///
    /// # Errors
    /// [`Error::NoFileSelected`], validation, [`Error::NoSession`],
    /// [`Error::Busy`], any storage error (profile untouched), or
    /// [`Error::PartialFailure`] when the object was stored but the row was
    /// not updated.
    #[instrument(skip_all, fields(file = ?file))]
    pub async fn upload_avatar(
        &self,
        context: &SessionContext,
        file: Option<AvatarFile>,
    ) -> Result<Profile> {
        let file = file.ok_or(Error::NoFileSelected)?;
        validate_avatar(&file, self.config.avatar_max_bytes())?;
        let session = Self::require_session(context)?;
        let identity = &session.identity;
        let token = &session.access_token;

        let _guard = self
            .in_flight
            .try_acquire(&identity.id, Lane::Avatar)
            .ok_or(Error::Busy)?;

        let current = self.profiles.read(token, &identity.id).await?;
        let key = self.media.new_key(&identity.id, &file.extension());
        self.media.upload(token, &key, &file).await?;
        debug!(key, url = %self.media.public_url(&key), "avatar object stored");

        let row = match self
            .profiles
            .update(token, &identity.id, &ProfilePatch::AvatarRef(Some(key.clone())))
            .await
        {
            Ok(row) => row,
            Err(err) => {
                let failure = Error::PartialFailure {
                    orphan: key,
                    reason: err.to_string(),
                };
                warn!("{failure}");
                return Err(failure);
            }
        };
        info!(key, "avatar replaced");

        if let Some(previous) = current.avatar_ref.as_deref() {
            self.reclaim(token, previous).await;
        }
        Ok(self.to_profile(row, Some(identity.email.clone())))
    }

    /// Remove the signed-in user's avatar.
    ///
    /// # Errors
    /// [`Error::NoSession`], [`Error::Busy`], [`Error::NothingToDelete`], or a
    /// storage error from clearing the row (object untouched).
    #[instrument(skip_all)]
    pub async fn delete_avatar(&self, context: &SessionContext) -> Result<Profile> {
        let session = Self::require_session(context)?;
        let identity = &session.identity;
        let token = &session.access_token;

        let _guard = self
            .in_flight
            .try_acquire(&identity.id, Lane::Avatar)
            .ok_or(Error::Busy)?;

        let current = self.profiles.read(token, &identity.id).await?;
        let previous = current.avatar_ref.ok_or(Error::NothingToDelete)?;
        let row = self
            .profiles
            .update(token, &identity.id, &ProfilePatch::AvatarRef(None))
            .await?;
        info!("avatar cleared");

        self.reclaim(token, &previous).await;
        Ok(self.to_profile(row, Some(identity.email.clone())))
    }

    /// Best-effort removal of an object the row no longer references.
    async fn reclaim(&self, token: &SecretString, reference: &str) {
        let Some(key) = self.media.key_from_reference(reference) else {
            let leak = Error::StorageLeak {
                key: reference.to_string(),
                reason: format!("not an object in bucket {}", self.media.bucket()),
            };
            warn!("{leak}");
            return;
        };

        match self.media.delete(token, &key).await {
            Ok(()) => debug!(key, "previous avatar reclaimed"),
            Err(Error::NotFound) => debug!(key, "previous avatar already gone"),
            Err(err) => {
                let leak = Error::StorageLeak {
                    key,
                    reason: err.to_string(),
                };
                warn!("{leak}");
            }
        }
    }
}
