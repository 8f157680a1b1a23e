use async_trait::async_trait;
use keyvalue_common::{Credentials, FederatedAssertion, Session};
use std::time::Duration;
use thiserror::Error;

mod firebase;
mod memory;

pub use firebase::FirebaseIdentity;
pub use memory::MemoryIdentity;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("credentials were rejected")]
    InvalidCredentials,
    #[error("an account already exists for this email")]
    EmailExists,
    #[error("identity provider refused the request: {0}")]
    Rejected(String),
    #[error("identity provider unreachable: {0}")]
    Transport(String),
    #[error("identity provider did not answer within {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

/// Authenticates users and issues sessions. Knows nothing about roles.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, ProviderError>;

    async fn sign_in_federated(
        &self,
        assertion: &FederatedAssertion,
    ) -> Result<Session, ProviderError>;

    /// Creates the account and signs it in.
    async fn create_account(
        &self,
        credentials: &Credentials,
        display_name: Option<&str>,
    ) -> Result<Session, ProviderError>;

    async fn sign_out(&self, session: &Session) -> Result<(), ProviderError>;
}
