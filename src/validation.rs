//! Synchronous field checks.
//!
//! Everything here is pure and cheap enough to run on every keystroke; the
//! orchestrator runs the same checks again before any write.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;
use crate::model::AvatarFile;

pub const DISPLAY_NAME_MIN: usize = 2;
pub const DISPLAY_NAME_MAX: usize = 50;

static EMAIL_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"));

/// Normalize an email for lookups and provider calls.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Shape check on `local@domain.tld`. Returns the normalized address.
///
/// # Errors
/// Returns [`ValidationError::InvalidEmail`] if the address does not match.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let normalized = normalize_email(email);
    if EMAIL_RE
        .as_ref()
        .is_ok_and(|regex| regex.is_match(&normalized))
    {
        Ok(normalized)
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

/// Presence only; strength rules belong to the identity provider.
///
/// # Errors
/// Returns [`ValidationError::MissingPassword`] for an empty password.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        Err(ValidationError::MissingPassword)
    } else {
        Ok(())
    }
}

/// Length bounds on the name as typed, counted in characters.
///
/// Whitespace is kept and counts toward the length; the name is stored
/// exactly as accepted.
///
/// # Errors
/// Returns [`ValidationError::TooShort`] or [`ValidationError::TooLong`].
pub fn validate_display_name(name: &str) -> Result<String, ValidationError> {
    let length = name.chars().count();
    if length < DISPLAY_NAME_MIN {
        return Err(ValidationError::TooShort);
    }
    if length > DISPLAY_NAME_MAX {
        return Err(ValidationError::TooLong);
    }
    Ok(name.to_string())
}

/// Only images within the size limit are accepted as avatars.
///
/// # Errors
/// Returns [`ValidationError::UnsupportedMediaType`] or
/// [`ValidationError::FileTooLarge`].
pub fn validate_avatar(file: &AvatarFile, max_bytes: usize) -> Result<(), ValidationError> {
    let content_type = file.content_type.trim().to_ascii_lowercase();
    if !content_type.starts_with("image/") {
        return Err(ValidationError::UnsupportedMediaType(content_type));
    }
    if file.bytes.len() > max_bytes {
        return Err(ValidationError::FileTooLarge { limit: max_bytes });
    }
    Ok(())
}
