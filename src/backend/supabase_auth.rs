//! Identity provider over the Supabase Auth (`GoTrue`) REST API.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{Instrument, info_span};

use super::{SupabaseClient, check_response};
use crate::gateway::{IdentityProvider, ProviderError};
use crate::model::{AuthSession, Identity, Registration};

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<String>,
    #[serde(default)]
    identities: Option<Vec<Value>>,
}

impl UserPayload {
    fn into_identity(self, fallback_email: &str) -> Identity {
        Identity {
            id: self.id,
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
            verified: self.email_confirmed_at.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionPayload {
    access_token: String,
    user: UserPayload,
}

impl SessionPayload {
    fn into_session(self, fallback_email: &str) -> AuthSession {
        AuthSession {
            identity: self.user.into_identity(fallback_email),
            access_token: SecretString::from(self.access_token),
        }
    }
}

/// Parse a sign-up response, which is either a bare user (confirmation
/// required) or a full session (auto-confirmed project).
fn parse_registration(body: Value, email: &str) -> Result<Registration, ProviderError> {
    let decode = |err: serde_json::Error| ProviderError::Rejected {
        status: None,
        message: format!("unexpected sign-up response: {err}"),
    };

    if body.get("access_token").is_some() {
        let payload: SessionPayload = serde_json::from_value(body).map_err(decode)?;
        let linked = payload.user.identities.as_ref().map_or(1, Vec::len);
        let session = payload.into_session(email);
        return Ok(Registration {
            identity: session.identity.clone(),
            linked_credentials: linked,
            session: Some(session),
        });
    }

    let user: UserPayload = serde_json::from_value(body).map_err(decode)?;
    let linked = user.identities.as_ref().map_or(1, Vec::len);
    Ok(Registration {
        identity: user.into_identity(email),
        linked_credentials: linked,
        session: None,
    })
}

#[derive(Clone)]
pub struct SupabaseAuth {
    client: SupabaseClient,
}

impl SupabaseAuth {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        metadata: &Value,
        confirm_redirect_url: &str,
    ) -> Result<Registration, ProviderError> {
        let url = self.client.url("auth/v1/signup")?;
        let span = info_span!("auth.signup", http.method = "POST");
        let response = self
            .client
            .request(Method::POST, url, None)
            .query(&[("redirect_to", confirm_redirect_url)])
            .json(&json!({
                "email": email,
                "password": password.expose_secret(),
                "data": metadata,
            }))
            .send()
            .instrument(span)
            .await?;
        let body: Value = check_response(response).await?.json().await?;
        parse_registration(body, email)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, ProviderError> {
        let url = self.client.url("auth/v1/token")?;
        let span = info_span!("auth.token", http.method = "POST");
        let response = self
            .client
            .request(Method::POST, url, None)
            .query(&[("grant_type", "password")])
            .json(&json!({
                "email": email,
                "password": password.expose_secret(),
            }))
            .send()
            .instrument(span)
            .await?;
        let payload: SessionPayload = check_response(response).await?.json().await?;
        Ok(payload.into_session(email))
    }

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), ProviderError> {
        let url = self.client.url("auth/v1/logout")?;
        let response = self
            .client
            .request(Method::POST, url, Some(access_token))
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> Result<(), ProviderError> {
        let url = self.client.url("auth/v1/recover")?;
        let response = self
            .client
            .request(Method::POST, url, None)
            .query(&[("redirect_to", redirect_url)])
            .json(&json!({ "email": email }))
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    async fn current_user(
        &self,
        access_token: &SecretString,
    ) -> Result<Option<Identity>, ProviderError> {
        let url = self.client.url("auth/v1/user")?;
        let response = self
            .client
            .request(Method::GET, url, Some(access_token))
            .send()
            .await?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }
        let user: UserPayload = check_response(response).await?.json().await?;
        Ok(Some(user.into_identity("")))
    }
}
