use docstore::StoreError;
use keyvalue_common::ValidationError;
use thiserror::Error;

/// Why a sign-in or sign-up did not produce a session. Causes are logged
/// where they happen; callers get only the coarse kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("federated sign-in failed")]
    ProviderFailure,
    #[error("not an organiser")]
    AccessDenied,
    #[error("email belongs to an organiser")]
    AdminEmailConflict,
    #[error("email already registered")]
    EmailInUse,
    #[error("account creation failed")]
    SignupFailed,
    #[error("organiser lookup failed")]
    LookupFailed,
}

impl AuthError {
    /// Text fit to show the person at the keyboard.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Invalid(err) => err.to_string(),
            AuthError::InvalidCredentials => String::from("Invalid email or password."),
            AuthError::ProviderFailure => String::from("Google sign-in failed."),
            AuthError::AccessDenied => String::from("Access denied. You are not an organiser."),
            AuthError::AdminEmailConflict => {
                String::from("This email belongs to an Admin. Please use the Admin Login.")
            }
            AuthError::EmailInUse => String::from("This email is already registered."),
            AuthError::SignupFailed => String::from("Signup failed. Please try again."),
            AuthError::LookupFailed => {
                String::from("Could not verify your account right now. Please try again.")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("writing {collection}/{key} failed: {source}")]
    RemoteWrite {
        collection: &'static str,
        key: String,
        source: StoreError,
    },
    #[error("reading from the store failed: {0}")]
    RemoteRead(#[source] StoreError),
    #[error("nobody is signed in")]
    NotSignedIn,
    #[error("data is still loading")]
    NotReady,
    #[error("no tenant with id {0}")]
    UnknownTenant(String),
}
