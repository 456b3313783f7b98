//! Records exchanged between the orchestrator, the gateways, and the UI layer.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const MAX_EXTENSION_CHARS: usize = 8;

/// The authenticated subject as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub verified: bool,
}

/// An identity plus the bearer token the provider issued for it.
#[derive(Clone, Debug)]
pub struct AuthSession {
    pub identity: Identity,
    pub access_token: SecretString,
}

/// What the provider returned for a sign-up request.
#[derive(Clone, Debug)]
pub struct Registration {
    pub identity: Identity,
    /// Credentials newly linked by this request; zero for an existing account.
    pub linked_credentials: usize,
    /// Present when the provider confirms accounts without an email round trip.
    pub session: Option<AuthSession>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignUpOutcome {
    /// A confirmation email is on its way.
    PendingConfirmation { email: String },
    /// The provider confirmed the account immediately.
    Authenticated { identity: Identity },
}

/// A `profiles` row as stored. `avatar_ref` is an object key, or a full public
/// URL on rows written by earlier clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    pub name: String,
    pub avatar_ref: Option<String>,
    pub points: u32,
}

/// Profile as returned to the UI layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: String,
    pub email: Option<String>,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub avatar_url: Option<String>,
    pub points: u32,
}

/// A single field-group update. Name and avatar are never written together so
/// a concurrent edit of the other group is not clobbered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfilePatch {
    DisplayName(String),
    AvatarRef(Option<String>),
}

impl ProfilePatch {
    /// Column name in the `profiles` table.
    #[must_use]
    pub fn column(&self) -> &'static str {
        match self {
            Self::DisplayName(_) => "name",
            Self::AvatarRef(_) => "avatar_url",
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::DisplayName(name) => json!({ "name": name }),
            Self::AvatarRef(reference) => json!({ "avatar_url": reference }),
        }
    }
}

/// An image chosen for upload.
#[derive(Clone)]
pub struct AvatarFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AvatarFile {
    #[must_use]
    pub fn new(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }

    /// Extension for the object key: the file name's suffix if it is short and
    /// alphanumeric, else the content subtype, else `bin`.
    #[must_use]
    pub fn extension(&self) -> String {
        let usable = |candidate: &str| {
            !candidate.is_empty()
                && candidate.len() <= MAX_EXTENSION_CHARS
                && candidate.chars().all(|c| c.is_ascii_alphanumeric())
        };

        if let Some((_, suffix)) = self.file_name.rsplit_once('.') {
            if usable(suffix) {
                return suffix.to_ascii_lowercase();
            }
        }

        let subtype = self
            .content_type
            .split(';')
            .next()
            .and_then(|mime| mime.split_once('/'))
            .map(|(_, subtype)| subtype.trim())
            .unwrap_or_default();
        let subtype = subtype.strip_prefix("x-").unwrap_or(subtype);
        if subtype == "jpeg" {
            return "jpg".to_string();
        }
        if usable(subtype) {
            return subtype.to_ascii_lowercase();
        }

        "bin".to_string()
    }
}

impl std::fmt::Debug for AvatarFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
