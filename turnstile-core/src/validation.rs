use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

/// Centralized validation for registration and password-change input
///
/// A single source of truth for validation logic so the credential store and
/// the password-reset flow enforce identical rules.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

/// Validates an email address
///
/// Returns `Ok(())` if the email is valid, or a `ValidationError::InvalidEmail`
/// if invalid. Matching is a practical subset of RFC 5322.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField(
            "Email is required".to_string(),
        ));
    }

    if email.len() > 254 {
        return Err(ValidationError::InvalidEmail(
            "Email is too long".to_string(),
        ));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(format!(
            "Invalid email format: {email}"
        )))
    }
}

/// Validates a password according to security requirements
///
/// # Password Requirements
///
/// - 8 to 128 characters
/// - At least one lowercase letter, one uppercase letter, one digit, and one
///   special character
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField(
            "Password is required".to_string(),
        ));
    }

    if password.len() < 8 {
        return Err(ValidationError::InvalidPassword(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(ValidationError::InvalidPassword(
            "Password must be no more than 128 characters long".to_string(),
        ));
    }

    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_ascii_alphanumeric());

    if !(has_lowercase && has_uppercase && has_digit && has_special) {
        return Err(ValidationError::InvalidPassword(
            "Password must contain at least one uppercase letter, one lowercase letter, \
             one digit, and one special character"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validates a display name
///
/// If provided, the name cannot be empty or whitespace only and is capped at
/// 100 characters.
pub fn validate_display_name(name: Option<&str>) -> Result<(), ValidationError> {
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(ValidationError::InvalidDisplayName(
                "Display name cannot be empty or whitespace only".to_string(),
            ));
        }

        if name.len() > 100 {
            return Err(ValidationError::InvalidDisplayName(
                "Display name must be no more than 100 characters long".to_string(),
            ));
        }
    }

    Ok(())
}
