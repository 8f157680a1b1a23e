use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{field} must be a number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("invalid billing period: {0}")]
    InvalidPeriod(String),
    #[error("password and confirmation do not match")]
    PasswordMismatch,
    #[error("a tenant with id {0} already exists")]
    DuplicateTenant(String),
}

/// Trimmed value of a required form field.
pub fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed)
    }
}
