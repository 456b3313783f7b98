use base64::Engine;
use rand::RngCore;
use secrecy::SecretString;
use std::str::FromStr;
use std::sync::Arc;

use super::{ObjectStore, ProviderError};
use crate::error::{Error, Result};
use crate::model::AvatarFile;

const TOKEN_BYTES: usize = 16;

/// How avatar object keys are laid out inside the bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyLayout {
    /// `{identity}-{token}.{ext}`
    #[default]
    Flat,
    /// `{identity}/{token}.{ext}`
    Scoped,
}

impl FromStr for KeyLayout {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "scoped" => Ok(Self::Scoped),
            other => Err(format!("unknown key layout: {other}")),
        }
    }
}

/// Object store wrapper bound to the avatars bucket.
#[derive(Clone)]
pub struct MediaStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    layout: KeyLayout,
}

impl MediaStore {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: String, layout: KeyLayout) -> Self {
        Self {
            store,
            bucket,
            layout,
        }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// A fresh key for `identity_id`. Keys are never reused, so a retried
    /// upload creates a second object instead of overwriting the first.
    #[must_use]
    pub fn new_key(&self, identity_id: &str, extension: &str) -> String {
        let token = random_token();
        match self.layout {
            KeyLayout::Flat => format!("{identity_id}-{token}.{extension}"),
            KeyLayout::Scoped => format!("{identity_id}/{token}.{extension}"),
        }
    }

    pub async fn upload(
        &self,
        access_token: &SecretString,
        key: &str,
        file: &AvatarFile,
    ) -> Result<()> {
        self.store
            .put_object(access_token, &self.bucket, key, &file.content_type, &file.bytes)
            .await
            .map_err(map_write_error)
    }

    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        self.store.public_url(&self.bucket, key)
    }

    /// Resolve a stored reference for display. Legacy rows already hold a URL.
    #[must_use]
    pub fn resolve(&self, reference: &str) -> String {
        if is_url(reference) {
            reference.to_string()
        } else {
            self.public_url(reference)
        }
    }

    /// Recover the object key from a stored reference. `None` if the reference
    /// is a URL outside this bucket.
    #[must_use]
    pub fn key_from_reference(&self, reference: &str) -> Option<String> {
        if !is_url(reference) {
            return Some(reference.to_string());
        }
        let prefix = self.public_url("");
        reference
            .strip_prefix(&prefix)
            .map(|key| key.split(['?', '#']).next().unwrap_or_default())
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }

    pub async fn delete(&self, access_token: &SecretString, key: &str) -> Result<()> {
        self.store
            .delete_object(access_token, &self.bucket, key)
            .await
            .map_err(map_write_error)
    }
}

fn map_write_error(err: ProviderError) -> Error {
    match err {
        ProviderError::NotFound => Error::NotFound,
        ProviderError::Rejected { message, .. } => Error::Provider(message),
        ProviderError::Unavailable(message) => Error::Transport(message),
    }
}

fn is_url(reference: &str) -> bool {
    reference.contains("://")
}

fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryObjectStore;
    use std::collections::HashSet;

    fn media(layout: KeyLayout) -> MediaStore {
        MediaStore::new(
            Arc::new(MemoryObjectStore::new()),
            "avatars".to_string(),
            layout,
        )
    }

    #[test]
    fn key_layouts() {
        let flat = media(KeyLayout::Flat).new_key("user-1", "png");
        assert!(flat.starts_with("user-1-"));
        assert!(flat.ends_with(".png"));
        assert!(!flat.contains('/'));

        let scoped = media(KeyLayout::Scoped).new_key("user-1", "jpg");
        assert!(scoped.starts_with("user-1/"));
        assert!(scoped.ends_with(".jpg"));
    }

    #[test]
    fn keys_are_not_reused() {
        let media = media(KeyLayout::Flat);
        let keys: HashSet<String> = (0..64).map(|_| media.new_key("user-1", "png")).collect();
        assert_eq!(keys.len(), 64);
    }

    #[test]
    fn key_layout_parses() {
        assert_eq!("flat".parse::<KeyLayout>(), Ok(KeyLayout::Flat));
        assert_eq!(" Scoped ".parse::<KeyLayout>(), Ok(KeyLayout::Scoped));
        assert!("nested".parse::<KeyLayout>().is_err());
    }

    #[test]
    fn key_from_reference_handles_keys_and_legacy_urls() {
        let media = media(KeyLayout::Flat);
        assert_eq!(
            media.key_from_reference("user-1-abc.png"),
            Some("user-1-abc.png".to_string())
        );

        let url = media.public_url("user-1-abc.png");
        assert_eq!(
            media.key_from_reference(&format!("{url}?v=2")),
            Some("user-1-abc.png".to_string())
        );
        assert_eq!(
            media.key_from_reference("https://cdn.example.com/other.png"),
            None
        );
        assert_eq!(media.resolve(&url), url);
        assert_eq!(media.resolve("user-1-abc.png"), url);
    }
}
