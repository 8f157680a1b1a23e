//! Identity provider living in process memory, for local runs without a
//! Firebase project and for tests.
use super::{IdentityProvider, ProviderError};
use async_trait::async_trait;
use keyvalue_common::{
    normalize_email, BearerToken, Credentials, FederatedAssertion, Session, User,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Default)]
pub struct MemoryIdentity {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    // email -> account
    accounts: HashMap<String, Account>,
    // federated id token -> (email, display name)
    assertions: HashMap<String, (String, Option<String>)>,
    active: HashSet<BearerToken>,
}

struct Account {
    uid: String,
    password: Option<String>,
    display_name: Option<String>,
}

impl State {
    fn issue(&mut self, email: &str) -> Option<Session> {
        let account = self.accounts.get(email)?;
        let session = Session {
            user: User {
                uid: account.uid.clone(),
                email: email.to_string(),
                display_name: account.display_name.clone(),
            },
            token: BearerToken::new(Uuid::new_v4().to_string()),
            refresh_token: Some(Uuid::new_v4().to_string()),
        };
        self.active.insert(session.token.clone());
        Some(session)
    }
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_account(self, email: &str, password: &str, display_name: Option<&str>) -> Self {
        self.add_account(email, password, display_name);
        self
    }

    pub fn add_account(&self, email: &str, password: &str, display_name: Option<&str>) {
        self.state().accounts.insert(
            normalize_email(email),
            Account {
                uid: Uuid::new_v4().to_string(),
                password: Some(password.to_string()),
                display_name: display_name.map(str::to_string),
            },
        );
    }

    /// Makes `id_token` a valid federated assertion for `email`.
    pub fn with_federated(self, id_token: &str, email: &str, display_name: Option<&str>) -> Self {
        self.state().assertions.insert(
            id_token.to_string(),
            (normalize_email(email), display_name.map(str::to_string)),
        );
        self
    }

    pub fn has_account(&self, email: &str) -> bool {
        self.state().accounts.contains_key(&normalize_email(email))
    }

    pub fn is_active(&self, token: &BearerToken) -> bool {
        self.state().active.contains(token)
    }

    pub fn active_sessions(&self) -> usize {
        self.state().active.len()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, ProviderError> {
        let email = normalize_email(&credentials.email);
        let mut state = self.state();
        let known = state
            .accounts
            .get(&email)
            .and_then(|account| account.password.as_deref())
            == Some(credentials.password.as_str());
        if !known {
            return Err(ProviderError::InvalidCredentials);
        }
        state.issue(&email).ok_or(ProviderError::InvalidCredentials)
    }

    async fn sign_in_federated(
        &self,
        assertion: &FederatedAssertion,
    ) -> Result<Session, ProviderError> {
        let mut state = self.state();
        let (email, display_name) = state
            .assertions
            .get(&assertion.id_token)
            .cloned()
            .ok_or(ProviderError::InvalidCredentials)?;
        // first federated sign-in creates the account
        state.accounts.entry(email.clone()).or_insert_with(|| Account {
            uid: Uuid::new_v4().to_string(),
            password: None,
            display_name,
        });
        state.issue(&email).ok_or(ProviderError::InvalidCredentials)
    }

    async fn create_account(
        &self,
        credentials: &Credentials,
        display_name: Option<&str>,
    ) -> Result<Session, ProviderError> {
        let email = normalize_email(&credentials.email);
        let mut state = self.state();
        if state.accounts.contains_key(&email) {
            return Err(ProviderError::EmailExists);
        }
        if credentials.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ProviderError::Rejected(String::from(
                "WEAK_PASSWORD : Password should be at least 6 characters",
            )));
        }
        state.accounts.insert(
            email.clone(),
            Account {
                uid: Uuid::new_v4().to_string(),
                password: Some(credentials.password.clone()),
                display_name: display_name.map(str::to_string),
            },
        );
        state.issue(&email).ok_or(ProviderError::InvalidCredentials)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), ProviderError> {
        self.state().active.remove(&session.token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_password_sign_in() {
        let identity = MemoryIdentity::new().with_account("a@x.com", "secret1", Some("Asha"));
        let session = identity
            .sign_in(&Credentials::new("a@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(session.user.display_name.as_deref(), Some("Asha"));
        assert!(identity.is_active(&session.token));

        assert!(matches!(
            identity.sign_in(&Credentials::new("a@x.com", "wrong")).await,
            Err(ProviderError::InvalidCredentials)
        ));
        assert!(matches!(
            identity.sign_in(&Credentials::new("b@x.com", "secret1")).await,
            Err(ProviderError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_create_account_rules() {
        let identity = MemoryIdentity::new().with_account("a@x.com", "secret1", None);
        assert!(matches!(
            identity
                .create_account(&Credentials::new("a@x.com", "another1"), None)
                .await,
            Err(ProviderError::EmailExists)
        ));
        assert!(matches!(
            identity.create_account(&Credentials::new("b@x.com", "123"), None).await,
            Err(ProviderError::Rejected(_))
        ));
        let session = identity
            .create_account(&Credentials::new("b@x.com", "secret2"), Some("Bala"))
            .await
            .unwrap();
        assert_eq!(session.email(), "b@x.com");
        assert!(identity.has_account("b@x.com"));
    }

    #[tokio::test]
    async fn test_federated_sign_in_creates_account_once() {
        let identity = MemoryIdentity::new().with_federated("g-token", "g@x.com", Some("Gita"));
        let first = identity
            .sign_in_federated(&FederatedAssertion::google("g-token"))
            .await
            .unwrap();
        let second = identity
            .sign_in_federated(&FederatedAssertion::google("g-token"))
            .await
            .unwrap();
        assert_eq!(first.user.uid, second.user.uid);
        assert_ne!(first.token, second.token);
        assert!(matches!(
            identity
                .sign_in_federated(&FederatedAssertion::google("forged"))
                .await,
            Err(ProviderError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_sign_out_deactivates_token() {
        let identity = MemoryIdentity::new().with_account("a@x.com", "secret1", None);
        let session = identity
            .sign_in(&Credentials::new("a@x.com", "secret1"))
            .await
            .unwrap();
        identity.sign_out(&session).await.unwrap();
        assert!(!identity.is_active(&session.token));
        assert_eq!(identity.active_sessions(), 0);
    }
}
