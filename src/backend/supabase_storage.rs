//! Object store over the Supabase Storage REST API.

use async_trait::async_trait;
use reqwest::{Method, header::CONTENT_TYPE};
use secrecy::SecretString;
use tracing::{Instrument, info_span};

use super::{SupabaseClient, check_response};
use crate::gateway::{ObjectStore, ProviderError};

#[derive(Clone)]
pub struct SupabaseStorage {
    client: SupabaseClient,
}

impl SupabaseStorage {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn put_object(
        &self,
        access_token: &SecretString,
        bucket: &str,
        key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), ProviderError> {
        let url = self
            .client
            .url(&format!("storage/v1/object/{bucket}/{key}"))?;
        let span = info_span!(
            "storage.put",
            storage.bucket = bucket,
            storage.key = key,
            storage.size = bytes.len()
        );
        let response = self
            .client
            .request(Method::POST, url, Some(access_token))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes.to_vec())
            .send()
            .instrument(span)
            .await?;
        check_response(response).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}storage/v1/object/public/{bucket}/{key}",
            self.client.base_url()
        )
    }

    async fn delete_object(
        &self,
        access_token: &SecretString,
        bucket: &str,
        key: &str,
    ) -> Result<(), ProviderError> {
        let url = self
            .client
            .url(&format!("storage/v1/object/{bucket}/{key}"))?;
        let span = info_span!("storage.delete", storage.bucket = bucket, storage.key = key);
        let response = self
            .client
            .request(Method::DELETE, url, Some(access_token))
            .send()
            .instrument(span)
            .await?;
        check_response(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn public_url_layout() -> Result<()> {
        let client = SupabaseClient::new(
            "https://project.supabase.co",
            SecretString::from("anon".to_string()),
        )?;
        let storage = SupabaseStorage::new(client);
        assert_eq!(
            storage.public_url("avatars", "user-1-abc.png"),
            "https://project.supabase.co/storage/v1/object/public/avatars/user-1-abc.png"
        );
        assert_eq!(
            storage.public_url("profile-images", "user-1/abc.png"),
            "https://project.supabase.co/storage/v1/object/public/profile-images/user-1/abc.png"
        );
        Ok(())
    }
}
