//! Concrete collaborators.
//!
//! - [`supabase_auth`], [`supabase_storage`], [`postgrest`]: Supabase REST APIs
//!   over `reqwest`, sharing one [`SupabaseClient`].
//! - [`postgres`]: the `profiles` table over a direct `sqlx` pool.
//! - [`memory`]: in-process fakes with failure injection for tests.

pub mod memory;
pub mod postgres;
pub mod postgrest;
pub mod supabase_auth;
pub mod supabase_storage;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::gateway::ProviderError;

/// Default request timeout applied to all Supabase calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error body characters carried into a `ProviderError`.
const MAX_ERROR_CHARS: usize = 200;

/// HTTP client bound to one Supabase project.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: Url,
    anon_key: SecretString,
}

impl SupabaseClient {
    /// # Errors
    /// Returns an error if the base URL cannot be used as a base or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str, anon_key: SecretString) -> anyhow::Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Supabase URL cannot be used as a base: {base_url}");
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            anon_key,
        })
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| ProviderError::Rejected {
                status: None,
                message: format!("invalid request path {path}: {err}"),
            })
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// A request carrying the project key and, if given, the user's bearer.
    pub(crate) fn request(
        &self,
        method: reqwest::Method,
        url: Url,
        access_token: Option<&SecretString>,
    ) -> RequestBuilder {
        let bearer = access_token.unwrap_or(&self.anon_key);
        self.http
            .request(method, url)
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(bearer.expose_secret())
    }
}

/// Turn a non-success response into a classified `ProviderError`.
pub(crate) async fn check_response(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    Err(classify_status(status, message))
}

fn classify_status(status: StatusCode, message: String) -> ProviderError {
    if status == StatusCode::NOT_FOUND {
        ProviderError::NotFound
    } else if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        ProviderError::Unavailable(format!("{status}: {message}"))
    } else {
        ProviderError::rejected(status.as_u16(), message)
    }
}

/// Pull a human-readable message out of the JSON error shapes Supabase uses.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str))
        .map(|message| message.chars().take(MAX_ERROR_CHARS).collect())
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Rejected {
                status: None,
                message: format!("unexpected response: {err}"),
            }
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}
