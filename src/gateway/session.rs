use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::{IdentityProvider, ProviderError};
use crate::error::{Error, Result};
use crate::model::{AuthSession, Identity, Registration};

/// Identity provider wrapper.
#[derive(Clone)]
pub struct SessionGateway {
    provider: Arc<dyn IdentityProvider>,
}

impl SessionGateway {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Provider rejections surface with the provider's own message; there is
    /// no state change to undo.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        display_name: &str,
        confirm_redirect_url: &str,
    ) -> Result<Registration> {
        let metadata = json!({ "name": display_name });
        self.provider
            .sign_up(email, password, &metadata, confirm_redirect_url)
            .await
            .map_err(|err| match err {
                ProviderError::Rejected { message, .. } => Error::Provider(message),
                ProviderError::NotFound => Error::Provider("sign-up is not available".to_string()),
                ProviderError::Unavailable(message) => Error::Transport(message),
            })
    }

    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<AuthSession> {
        self.provider
            .sign_in_with_password(email, password)
            .await
            .map_err(|err| match err {
                ProviderError::Rejected { .. } | ProviderError::NotFound => {
                    Error::AuthenticationFailed
                }
                ProviderError::Unavailable(message) => Error::Transport(message),
            })
    }

    pub async fn sign_out(&self, access_token: &SecretString) -> Result<()> {
        match self.provider.sign_out(access_token).await {
            Ok(()) => Ok(()),
            // The token is already dead on the provider side.
            Err(ProviderError::Rejected { .. } | ProviderError::NotFound) => Ok(()),
            Err(ProviderError::Unavailable(message)) => Err(Error::Transport(message)),
        }
    }

    /// Succeeds unless the request could not be delivered. Whether the address
    /// belongs to an account is the provider's business, not ours.
    pub async fn request_password_reset(&self, email: &str, redirect_url: &str) -> Result<()> {
        match self.provider.request_password_reset(email, redirect_url).await {
            Ok(()) => Ok(()),
            Err(err @ (ProviderError::Rejected { .. } | ProviderError::NotFound)) => {
                debug!("password reset not accepted by provider: {err}");
                Ok(())
            }
            Err(ProviderError::Unavailable(message)) => Err(Error::Transport(message)),
        }
    }

    pub async fn current_user(&self, access_token: &SecretString) -> Result<Option<Identity>> {
        match self.provider.current_user(access_token).await {
            Ok(identity) => Ok(identity),
            Err(ProviderError::Rejected { .. } | ProviderError::NotFound) => Ok(None),
            Err(ProviderError::Unavailable(message)) => Err(Error::Transport(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryIdentityProvider, MemoryOp};

    fn gateway(provider: &Arc<MemoryIdentityProvider>) -> SessionGateway {
        SessionGateway::new(provider.clone())
    }

    #[tokio::test]
    async fn sign_in_rejection_maps_to_authentication_failed() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let result = gateway(&provider)
            .sign_in("nobody@example.com", &SecretString::from("pw".to_string()))
            .await;
        assert_eq!(result.err(), Some(Error::AuthenticationFailed));
    }

    #[tokio::test]
    async fn sign_up_rejection_keeps_provider_message() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider.fail_next(
            MemoryOp::SignUp,
            ProviderError::rejected(422, "Password should be at least 6 characters"),
        );
        let result = gateway(&provider)
            .sign_up(
                "a@b.com",
                &SecretString::from("pw".to_string()),
                "Max",
                "http://localhost/auth/callback",
            )
            .await;
        assert_eq!(
            result.err(),
            Some(Error::Provider(
                "Password should be at least 6 characters".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn password_reset_hides_rejections_but_not_transport() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let gateway = gateway(&provider);

        provider.fail_next(
            MemoryOp::ResetPassword,
            ProviderError::rejected(400, "User not found"),
        );
        assert_eq!(
            gateway
                .request_password_reset("ghost@example.com", "http://localhost/reset-password")
                .await,
            Ok(())
        );

        provider.fail_next(
            MemoryOp::ResetPassword,
            ProviderError::Unavailable("connection reset".to_string()),
        );
        assert_eq!(
            gateway
                .request_password_reset("ghost@example.com", "http://localhost/reset-password")
                .await,
            Err(Error::Transport("connection reset".to_string()))
        );
    }

    #[tokio::test]
    async fn current_user_with_unknown_token_is_none() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let identity = gateway(&provider)
            .current_user(&SecretString::from("stale".to_string()))
            .await;
        assert_eq!(identity, Ok(None));
    }
}
