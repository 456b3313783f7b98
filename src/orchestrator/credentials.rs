//! Credential lifecycle: sign-up, sign-in, sign-out, password reset.
//!
//! All four share the context's single `Authenticating` slot, so a double
//! click produces exactly one provider call.

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use super::{CredentialState, Orchestrator, SessionContext};
use crate::error::{Error, Result};
use crate::model::{AuthSession, Identity, SignUpOutcome};
use crate::validation::{validate_display_name, validate_email, validate_password};

impl Orchestrator {
    /// Register a new account.
    ///
    /// An address that already has an account yields
    /// [`Error::AlreadyRegistered`] and nothing else; the provider does not
    /// reveal whether that account is otherwise usable.
    ///
    /// # Errors
    /// Validation, [`Error::Busy`], [`Error::AlreadyRegistered`],
    /// [`Error::Provider`], or [`Error::Transport`].
    #[instrument(skip(self, context, password))]
    pub async fn sign_up(
        &self,
        context: &SessionContext,
        email: &str,
        password: &SecretString,
        display_name: &str,
    ) -> Result<SignUpOutcome> {
        let email = validate_email(email)?;
        validate_password(password.expose_secret())?;
        let display_name = validate_display_name(display_name)?;

        let attempt = context.begin().ok_or(Error::Busy)?;
        let registration = self
            .sessions
            .sign_up(
                &email,
                password,
                &display_name,
                self.config.confirm_redirect_url(),
            )
            .await?;

        if registration.linked_credentials == 0 {
            info!("sign-up attempted for an existing account");
            return Err(Error::AlreadyRegistered);
        }

        if let Some(session) = registration.session {
            let identity = session.identity.clone();
            attempt.finish(
                CredentialState::Authenticated {
                    identity: identity.clone(),
                },
                Some(session),
            );
            return Ok(SignUpOutcome::Authenticated { identity });
        }

        info!(identity = %registration.identity.id, "sign-up pending confirmation");
        // A live session is kept; dropping the attempt restores it.
        if context.session().is_none() {
            attempt.finish(
                CredentialState::PendingConfirmation {
                    email: email.clone(),
                },
                None,
            );
        }
        Ok(SignUpOutcome::PendingConfirmation { email })
    }

    /// # Errors
    /// Validation, [`Error::Busy`], [`Error::AuthenticationFailed`], or
    /// [`Error::Transport`]. On failure the context keeps its previous state.
    #[instrument(skip(self, context, password))]
    pub async fn sign_in(
        &self,
        context: &SessionContext,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity> {
        let email = validate_email(email)?;
        validate_password(password.expose_secret())?;

        let attempt = context.begin().ok_or(Error::Busy)?;
        let session = self.sessions.sign_in(&email, password).await?;
        let identity = session.identity.clone();
        attempt.finish(
            CredentialState::Authenticated {
                identity: identity.clone(),
            },
            Some(session),
        );

        info!(identity = %identity.id, "signed in");
        Ok(identity)
    }

    /// Revoke the provider session and forget it locally. The local session is
    /// cleared even if the provider cannot be reached.
    ///
    /// # Errors
    /// [`Error::Busy`] while another credential operation is pending.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, context: &SessionContext) -> Result<()> {
        let attempt = context.begin().ok_or(Error::Busy)?;
        if let Some(session) = context.session() {
            if let Err(err) = self.sessions.sign_out(&session.access_token).await {
                warn!("provider sign-out failed, clearing local session anyway: {err}");
            }
        }
        attempt.finish(CredentialState::Anonymous, None);
        Ok(())
    }

    /// Ask the provider to email a reset link. Reports success whether or not
    /// the address is registered.
    ///
    /// # Errors
    /// Validation, [`Error::Busy`], or [`Error::Transport`].
    #[instrument(skip(self, context))]
    pub async fn request_password_reset(&self, context: &SessionContext, email: &str) -> Result<()> {
        let email = validate_email(email)?;

        let attempt = context.begin().ok_or(Error::Busy)?;
        self.sessions
            .request_password_reset(&email, self.config.reset_redirect_url())
            .await?;

        // A signed-in user stays signed in; dropping the attempt restores it.
        if context.session().is_none() {
            attempt.finish(CredentialState::ResetRequested { email }, None);
        }
        Ok(())
    }

    /// Rebuild a signed-in context from a previously issued access token.
    ///
    /// # Errors
    /// [`Error::NoSession`] if the provider no longer recognizes the token,
    /// [`Error::Busy`], or [`Error::Transport`].
    #[instrument(skip_all)]
    pub async fn restore_session(
        &self,
        context: &SessionContext,
        access_token: SecretString,
    ) -> Result<Identity> {
        let attempt = context.begin().ok_or(Error::Busy)?;
        let identity = self
            .sessions
            .current_user(&access_token)
            .await?
            .ok_or(Error::NoSession)?;

        attempt.finish(
            CredentialState::Authenticated {
                identity: identity.clone(),
            },
            Some(AuthSession {
                identity: identity.clone(),
                access_token,
            }),
        );
        Ok(identity)
    }
}
