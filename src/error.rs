//! Closed error taxonomy shared by the gateways and the orchestrator.
//!
//! Provider-specific failures (HTTP bodies, `sqlx` errors) are mapped into
//! these kinds at the gateway boundary and never travel further.

use thiserror::Error;

use crate::validation::{DISPLAY_NAME_MAX, DISPLAY_NAME_MIN};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Local, field-level failures. These never reach a backend.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password is required")]
    MissingPassword,
    #[error("display name must be at least {} characters", DISPLAY_NAME_MIN)]
    TooShort,
    #[error("display name must be at most {} characters", DISPLAY_NAME_MAX)]
    TooLong,
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("file exceeds the {limit} byte limit")]
    FileTooLarge { limit: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("email address is already registered")]
    AlreadyRegistered,
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("no active session")]
    NoSession,
    #[error("another request is still pending")]
    Busy,
    #[error("no file selected")]
    NoFileSelected,
    #[error("there is no avatar to delete")]
    NothingToDelete,
    #[error("not found")]
    NotFound,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider error: {0}")]
    Provider(String),
    /// The media object was written but the profile reference was not updated.
    /// The previous reference is still authoritative; `orphan` is unreferenced.
    #[error("avatar {orphan} uploaded but the profile was not updated: {reason}")]
    PartialFailure { orphan: String, reason: String },
    /// Best-effort cleanup failed. Logged, never returned to the caller.
    #[error("failed to reclaim {key}: {reason}")]
    StorageLeak { key: String, reason: String },
}

impl Error {
    /// Whether resubmitting the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::PartialFailure { .. } | Self::Busy
        )
    }

    /// Text safe to show to the end user.
    ///
    /// Auth failures are reported verbatim without detail so the response does
    /// not reveal whether an account exists.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::AlreadyRegistered => "This email address is already registered.".to_string(),
            Self::AuthenticationFailed => "Invalid email or password.".to_string(),
            Self::NoSession => "Please sign in to continue.".to_string(),
            Self::Busy => "Please wait for the current request to finish.".to_string(),
            Self::NoFileSelected => "You must select an image to upload.".to_string(),
            Self::NothingToDelete => "There is no image to delete.".to_string(),
            Self::NotFound => "The profile could not be loaded.".to_string(),
            Self::Transport(_) => {
                "The service is currently unreachable. Please try again.".to_string()
            }
            Self::Provider(message) => message.clone(),
            Self::PartialFailure { .. } => {
                "The image was uploaded but the profile could not be updated. Please try again."
                    .to_string()
            }
            // Never surfaced, but keep the mapping total.
            Self::StorageLeak { .. } => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_convert() {
        let err: Error = ValidationError::TooShort.into();
        assert_eq!(err, Error::Validation(ValidationError::TooShort));
        assert_eq!(err.to_string(), "display name must be at least 2 characters");
    }

    #[test]
    fn auth_messages_do_not_leak_details() {
        assert_eq!(
            Error::AuthenticationFailed.user_message(),
            "Invalid email or password."
        );
        let transport = Error::Transport("connection refused (10.0.0.1:443)".to_string());
        assert!(!transport.user_message().contains("10.0.0.1"));
    }

    #[test]
    fn retryable_kinds() {
        assert!(Error::Transport("timeout".to_string()).is_retryable());
        assert!(
            Error::PartialFailure {
                orphan: "a-b.png".to_string(),
                reason: "timeout".to_string(),
            }
            .is_retryable()
        );
        assert!(!Error::AlreadyRegistered.is_retryable());
        assert!(!Error::Validation(ValidationError::TooLong).is_retryable());
    }
}
