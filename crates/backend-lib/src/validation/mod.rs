// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Request validation, applied before any session logic runs.

use authgate_common::{SignInRequest, SignUpRequest};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::auth::password::{validate_password_strength, PasswordRequirements};

const MIN_NAME_LENGTH: usize = 3;
const MAX_NAME_LENGTH: usize = 100;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex is valid")
});

/// Possible validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate an email address
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    if email.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "Email address cannot be empty".to_string(),
        ));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email address cannot exceed {MAX_EMAIL_LENGTH} characters"
        )));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Please enter a valid email address".to_string(),
        ));
    }

    Ok(email)
}

/// Validate a display name
pub fn validate_name(name: &str) -> ValidationResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidName("Name is required".to_string()));
    }

    let length = trimmed.chars().count();
    if length < MIN_NAME_LENGTH {
        return Err(ValidationError::InvalidName(format!(
            "Name must be at least {MIN_NAME_LENGTH} characters"
        )));
    }
    if length > MAX_NAME_LENGTH {
        return Err(ValidationError::InvalidName(format!(
            "Name cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }

    Ok(name)
}

/// Minimum length check shared by sign-up and sign-in
fn validate_password_length<'a>(
    password: &'a str,
    requirements: &PasswordRequirements,
) -> ValidationResult<&'a str> {
    if password.is_empty() {
        return Err(ValidationError::InvalidPassword(
            "Password is required".to_string(),
        ));
    }

    let length = password.chars().count();
    if length < requirements.min_length {
        return Err(ValidationError::InvalidPassword(format!(
            "Password must be at least {} characters",
            requirements.min_length
        )));
    }

    Ok(password)
}

/// Validate a new password against the full policy
pub fn validate_new_password<'a>(
    password: &'a str,
    requirements: &PasswordRequirements,
) -> ValidationResult<&'a str> {
    validate_password_length(password, requirements)?;

    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "Password cannot exceed {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    if !validate_password_strength(password, requirements) {
        return Err(ValidationError::InvalidPassword(
            "Password must contain at least one letter, one number, and one special character"
                .to_string(),
        ));
    }

    Ok(password)
}

/// Validate a sign-up request
pub fn validate_signup(
    request: &SignUpRequest,
    requirements: &PasswordRequirements,
) -> ValidationResult<()> {
    validate_email(&request.email)?;
    validate_name(&request.name)?;
    validate_new_password(&request.password, requirements)?;
    Ok(())
}

/// Validate a sign-in request. Complexity is not checked so that accounts
/// created under an older policy can still sign in.
pub fn validate_signin(
    request: &SignInRequest,
    requirements: &PasswordRequirements,
) -> ValidationResult<()> {
    validate_email(&request.email)?;
    validate_password_length(&request.password, requirements)?;
    Ok(())
}
