use tracing::{debug, instrument};

use super::{Lane, Orchestrator, SessionContext};
use crate::error::{Error, Result};
use crate::model::{Profile, ProfilePatch};
use crate::validation::validate_display_name;

impl Orchestrator {
    /// Fetch the signed-in user's profile, with the avatar reference resolved
    /// to a displayable URL.
    ///
    /// An expired session clears the context and yields [`Error::NoSession`].
    ///
    /// # Errors
    /// [`Error::NoSession`], [`Error::NotFound`] if no row was provisioned,
    /// [`Error::Transport`], or [`Error::Provider`].
    #[instrument(skip_all)]
    pub async fn load_profile(&self, context: &SessionContext) -> Result<Profile> {
        let session = Self::require_session(context)?;
        let Some(identity) = self.sessions.current_user(&session.access_token).await? else {
            debug!("session expired, clearing local state");
            context.clear();
            return Err(Error::NoSession);
        };

        let row = self.profiles.read(&session.access_token, &identity.id).await?;
        Ok(self.to_profile(row, Some(identity.email)))
    }

    /// Persist a new display name. The returned profile reflects the write
    /// acknowledgment; on error the caller keeps showing its last confirmed
    /// value.
    ///
    /// # Errors
    /// Validation, [`Error::NoSession`], [`Error::Busy`], [`Error::NotFound`],
    /// [`Error::Transport`], or [`Error::Provider`].
    #[instrument(skip(self, context))]
    pub async fn update_display_name(
        &self,
        context: &SessionContext,
        display_name: &str,
    ) -> Result<Profile> {
        let display_name = validate_display_name(display_name)?;
        let session = Self::require_session(context)?;
        let identity = &session.identity;

        let _guard = self
            .in_flight
            .try_acquire(&identity.id, Lane::DisplayName)
            .ok_or(Error::Busy)?;
        let row = self
            .profiles
            .update(
                &session.access_token,
                &identity.id,
                &ProfilePatch::DisplayName(display_name),
            )
            .await?;

        Ok(self.to_profile(row, Some(identity.email.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::super::Status;
    use super::super::fixture::{EMAIL, Fixture};
    use super::*;
    use crate::backend::memory::{MemoryObjectStore, MemoryOp, MemoryProfileStore};
    use crate::error::ValidationError;
    use crate::gateway::ProviderError;
    use crate::orchestrator::CredentialState;
    use anyhow::Result;
    use std::time::Duration;

    #[tokio::test]
    async fn load_profile_after_sign_in() -> Result<()> {
        let fixture = Fixture::new();
        let (context, id) = fixture.signed_in().await?;

        let profile = fixture.orchestrator.load_profile(&context).await?;
        assert_eq!(profile.id, id);
        assert_eq!(profile.email.as_deref(), Some(EMAIL));
        assert_eq!(profile.display_name, "Max");
        assert_eq!(profile.avatar_url, None);
        assert_eq!(profile.points, 0);
        Ok(())
    }

    #[tokio::test]
    async fn load_profile_without_session() {
        let fixture = Fixture::new();
        let context = SessionContext::new();
        assert_eq!(
            fixture.orchestrator.load_profile(&context).await,
            Err(Error::NoSession)
        );
        assert_eq!(fixture.provider.calls(MemoryOp::CurrentUser), 0);
    }

    #[tokio::test]
    async fn expired_session_clears_context() -> Result<()> {
        let fixture = Fixture::new();
        let (context, _) = fixture.signed_in().await?;
        fixture.provider.expire_sessions();

        assert_eq!(
            fixture.orchestrator.load_profile(&context).await,
            Err(Error::NoSession)
        );
        assert_eq!(context.state(), CredentialState::Anonymous);
        assert!(context.session().is_none());
        assert_eq!(fixture.rows.calls(MemoryOp::ReadRow), 0);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_name_never_reaches_the_store() -> Result<()> {
        let fixture = Fixture::new();
        let (context, id) = fixture.signed_in().await?;

        for name in ["M", " ", "x".repeat(51).as_str()] {
            let result = fixture.orchestrator.update_display_name(&context, name).await;
            assert!(matches!(result, Err(Error::Validation(_))));
        }
        assert_eq!(
            fixture
                .orchestrator
                .update_display_name(&context, &format!("{} ", "x".repeat(50)))
                .await,
            Err(Error::Validation(ValidationError::TooLong))
        );
        assert_eq!(fixture.rows.calls(MemoryOp::UpdateRow), 0);
        assert_eq!(fixture.rows.get(&id).map(|row| row.name), Some("Max".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn update_display_name_uses_acknowledged_row() -> Result<()> {
        let fixture = Fixture::new();
        let (context, id) = fixture.signed_in().await?;

        let profile = fixture
            .orchestrator
            .update_display_name(&context, " Maximilian")
            .await?;
        assert_eq!(profile.display_name, " Maximilian");
        assert_eq!(
            fixture.rows.get(&id).map(|row| row.name),
            Some(" Maximilian".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn failed_write_keeps_stored_name() -> Result<()> {
        let fixture = Fixture::new();
        let (context, id) = fixture.signed_in().await?;
        fixture.rows.fail_next(
            MemoryOp::UpdateRow,
            ProviderError::Unavailable("connection refused".to_string()),
        );

        assert_eq!(
            fixture.orchestrator.update_display_name(&context, "Maxi").await,
            Err(Error::Transport("connection refused".to_string()))
        );
        assert_eq!(fixture.rows.get(&id).map(|row| row.name), Some("Max".to_string()));
        assert_eq!(
            fixture.orchestrator.profile_status(&id, Lane::DisplayName),
            Status::Idle
        );
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_rename_is_refused() -> Result<()> {
        let fixture = Fixture::with_stores(
            MemoryObjectStore::new(),
            MemoryProfileStore::new().with_latency(Duration::from_millis(20)),
        );
        let (context, _) = fixture.signed_in().await?;

        let (first, second) = tokio::join!(
            fixture.orchestrator.update_display_name(&context, "Maxi"),
            fixture.orchestrator.update_display_name(&context, "Maxine"),
        );
        assert_eq!(first.map(|profile| profile.display_name)?, "Maxi");
        assert_eq!(second, Err(Error::Busy));
        assert_eq!(fixture.rows.calls(MemoryOp::UpdateRow), 1);
        Ok(())
    }
}
