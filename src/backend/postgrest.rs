//! `profiles` table over the Supabase `PostgREST` API.

use async_trait::async_trait;
use reqwest::Method;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{Instrument, info_span};

use super::{SupabaseClient, check_response};
use crate::gateway::{ProviderError, RelationalStore};
use crate::model::{ProfilePatch, ProfileRow};

const PROFILE_COLUMNS: &str = "id,name,avatar_url,points";

#[derive(Debug, Deserialize)]
struct ProfilePayload {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default)]
    points: Option<i64>,
}

impl From<ProfilePayload> for ProfileRow {
    fn from(payload: ProfilePayload) -> Self {
        Self {
            id: payload.id,
            name: payload.name.unwrap_or_default(),
            avatar_ref: payload.avatar_url.filter(|value| !value.is_empty()),
            points: payload
                .points
                .and_then(|points| u32::try_from(points).ok())
                .unwrap_or(0),
        }
    }
}

#[derive(Clone)]
pub struct PostgrestProfiles {
    client: SupabaseClient,
}

impl PostgrestProfiles {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RelationalStore for PostgrestProfiles {
    async fn read_profile(
        &self,
        access_token: &SecretString,
        id: &str,
    ) -> Result<Option<ProfileRow>, ProviderError> {
        let url = self.client.url("rest/v1/profiles")?;
        let span = info_span!("db.query", db.system = "postgrest", db.operation = "SELECT");
        let response = self
            .client
            .request(Method::GET, url, Some(access_token))
            .query(&[
                ("select", PROFILE_COLUMNS.to_string()),
                ("id", format!("eq.{id}")),
                ("limit", "1".to_string()),
            ])
            .send()
            .instrument(span)
            .await?;
        let rows: Vec<ProfilePayload> = check_response(response).await?.json().await?;
        Ok(rows.into_iter().next().map(ProfileRow::from))
    }

    async fn update_profile(
        &self,
        access_token: &SecretString,
        id: &str,
        patch: &ProfilePatch,
    ) -> Result<Option<ProfileRow>, ProviderError> {
        let url = self.client.url("rest/v1/profiles")?;
        let span = info_span!(
            "db.query",
            db.system = "postgrest",
            db.operation = "UPDATE",
            db.column = patch.column()
        );
        let response = self
            .client
            .request(Method::PATCH, url, Some(access_token))
            .query(&[
                ("select", PROFILE_COLUMNS.to_string()),
                ("id", format!("eq.{id}")),
            ])
            .header("Prefer", "return=representation")
            .json(&patch.to_json())
            .send()
            .instrument(span)
            .await?;
        let rows: Vec<ProfilePayload> = check_response(response).await?.json().await?;
        Ok(rows.into_iter().next().map(ProfileRow::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_defaults_and_clamps() -> Result<(), serde_json::Error> {
        let payload: ProfilePayload = serde_json::from_value(json!({
            "id": "user-1",
            "name": null,
            "avatar_url": "",
            "points": -3
        }))?;
        assert_eq!(
            ProfileRow::from(payload),
            ProfileRow {
                id: "user-1".to_string(),
                name: String::new(),
                avatar_ref: None,
                points: 0,
            }
        );
        Ok(())
    }

    #[test]
    fn payload_keeps_reference() -> Result<(), serde_json::Error> {
        let payload: ProfilePayload = serde_json::from_value(json!({
            "id": "user-1",
            "name": "Max",
            "avatar_url": "user-1-abc.png",
            "points": 150
        }))?;
        let row = ProfileRow::from(payload);
        assert_eq!(row.avatar_ref.as_deref(), Some("user-1-abc.png"));
        assert_eq!(row.points, 150);
        Ok(())
    }
}
